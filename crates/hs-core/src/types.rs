use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn synthetic() -> Self {
        Self {
            start: SourceLocation { line: 1, column: 1 },
            end: SourceLocation { line: 1, column: 1 },
        }
    }
}

/// Handle to an element owned by the document. Copying it never extends the element's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Contains,
    Matches,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "mod",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Positional {
    First,
    Last,
}

/// Expression nodes as produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Literal {
        value: Literal,
    },
    Identifier {
        name: String,
    },
    ClassRef {
        name: String,
    },
    IdRef {
        id: String,
    },
    /// Raw query literal, either `<tag.class/>` bracket form or plain CSS.
    Query {
        selector: String,
    },
    AttributeRef {
        name: String,
    },
    Property {
        object: Box<Node>,
        name: String,
    },
    Index {
        object: Box<Node>,
        index: Box<Node>,
    },
    Array {
        items: Vec<Node>,
    },
    Object {
        entries: Vec<(String, Node)>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        callee: String,
        args: Vec<Node>,
    },
    Closest {
        selector: String,
    },
    Positional {
        which: Positional,
        source: Box<Node>,
    },
}

impl Node {
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal {
            value: Literal::String(value.into()),
        }
    }

    pub fn number(value: f64) -> Self {
        Self::Literal {
            value: Literal::Number(value),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::Literal {
            value: Literal::Boolean(value),
        }
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn property(object: Node, name: impl Into<String>) -> Self {
        Self::Property {
            object: Box::new(object),
            name: name.into(),
        }
    }
}

/// Where `put` places its content relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertPosition {
    Into,
    Before,
    After,
    AtStart,
    AtEnd,
}

impl InsertPosition {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Into => "into",
            Self::Before => "before",
            Self::After => "after",
            Self::AtStart => "at start of",
            Self::AtEnd => "at end of",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "into" => Some(Self::Into),
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            "at start of" | "at the start of" => Some(Self::AtStart),
            "at end of" | "at the end of" => Some(Self::AtEnd),
            _ => None,
        }
    }
}

/// A command invocation. `modifiers` holds keyword-introduced operands (`to`, `from`, `in`, ...)
/// and `blocks` holds nested command sequences for block commands (`if`, `repeat`, `tell`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNode {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Node>,
    #[serde(default)]
    pub modifiers: BTreeMap<String, Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<InsertPosition>,
    #[serde(default)]
    pub blocks: Vec<Vec<CommandNode>>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl CommandNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            modifiers: BTreeMap::new(),
            position: None,
            blocks: Vec::new(),
            source: String::new(),
            span: None,
        }
    }

    pub fn arg(mut self, node: Node) -> Self {
        self.args.push(node);
        self
    }

    pub fn modifier(mut self, keyword: impl Into<String>, node: Node) -> Self {
        self.modifiers.insert(keyword.into(), node);
        self
    }

    pub fn block(mut self, commands: Vec<CommandNode>) -> Self {
        self.blocks.push(commands);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Feature {
    On {
        events: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Node>,
        body: Vec<CommandNode>,
    },
    Def {
        name: String,
        params: Vec<String>,
        body: Vec<CommandNode>,
    },
    Init {
        body: Vec<CommandNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub features: Vec<Feature>,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn insert_position_keywords_tolerate_articles_and_spacing() {
        assert_eq!(
            InsertPosition::from_keyword("at  the end of"),
            Some(InsertPosition::AtEnd)
        );
        assert_eq!(InsertPosition::from_keyword("into"), Some(InsertPosition::Into));
        assert_eq!(InsertPosition::from_keyword("onto"), None);
        assert_eq!(InsertPosition::AtStart.keyword(), "at start of");
    }

    #[test]
    fn command_node_builder_collects_parts() {
        let node = CommandNode::new("add")
            .arg(Node::ClassRef {
                name: "active".to_string(),
            })
            .modifier("to", Node::identifier("me"))
            .source("add .active to me");
        assert_eq!(node.args.len(), 1);
        assert!(node.modifiers.contains_key("to"));
        assert!(node.position.is_none());
    }
}
