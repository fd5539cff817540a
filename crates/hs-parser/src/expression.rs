use hs_core::{BinaryOp, ErrorDescriptor, Literal, Node, Positional, UnaryOp};

use crate::lexer::TokenKind;
use crate::parser::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> Result<Node, ErrorDescriptor> {
        self.parse_or()
    }

    /// A single operand without binary operators, for clauses followed by `or`.
    pub(crate) fn parse_operand(&mut self) -> Result<Node, ErrorDescriptor> {
        self.parse_unary()
    }

    fn parse_or(&mut self) -> Result<Node, ErrorDescriptor> {
        let mut left = self.parse_and()?;
        while self.accept_ident("or") {
            let right = self.parse_and()?;
            left = Node::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, ErrorDescriptor> {
        let mut left = self.parse_comparison()?;
        while self.accept_ident("and") {
            let right = self.parse_comparison()?;
            left = Node::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Node, ErrorDescriptor> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_operator() else {
            return Ok(left);
        };
        let right = self.parse_additive()?;
        Ok(Node::binary(op, left, right))
    }

    fn comparison_operator(&mut self) -> Option<BinaryOp> {
        let symbol_ops = [
            ("==", BinaryOp::Equal),
            ("!=", BinaryOp::NotEqual),
            ("<=", BinaryOp::LessEqual),
            (">=", BinaryOp::GreaterEqual),
            ("<", BinaryOp::Less),
            (">", BinaryOp::Greater),
        ];
        for (symbol, op) in symbol_ops {
            if self.accept_symbol(symbol) {
                return Some(op);
            }
        }
        if self.accept_ident("contains") {
            return Some(BinaryOp::Contains);
        }
        if self.accept_ident("matches") {
            return Some(BinaryOp::Matches);
        }
        if self.accept_ident("is") {
            let negated = self.accept_ident("not");
            let op = if self.accept_ident("greater") {
                self.accept_ident("than");
                BinaryOp::Greater
            } else if self.accept_ident("less") {
                self.accept_ident("than");
                BinaryOp::Less
            } else {
                self.accept_ident("equal");
                self.accept_ident("to");
                BinaryOp::Equal
            };
            return Some(match (negated, op) {
                (false, op) => op,
                (true, BinaryOp::Greater) => BinaryOp::LessEqual,
                (true, BinaryOp::Less) => BinaryOp::GreaterEqual,
                (true, _) => BinaryOp::NotEqual,
            });
        }
        None
    }

    fn parse_additive(&mut self) -> Result<Node, ErrorDescriptor> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.accept_symbol("+") {
                BinaryOp::Add
            } else if self.accept_symbol("-") {
                BinaryOp::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ErrorDescriptor> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.accept_symbol("*") {
                BinaryOp::Multiply
            } else if self.accept_symbol("/") {
                BinaryOp::Divide
            } else if self.accept_symbol("%") || self.accept_ident("mod") {
                BinaryOp::Modulo
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ErrorDescriptor> {
        if self.accept_symbol("-") {
            let operand = self.parse_unary()?;
            return Ok(Node::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }
        if self.accept_ident("not") {
            let operand = self.parse_unary()?;
            return Ok(Node::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Node, ErrorDescriptor> {
        let mut node = self.parse_primary()?;
        loop {
            let Some(token) = self.peek() else {
                break;
            };
            if token.is_symbol(".") || matches!(token.kind, TokenKind::Possessive) {
                self.index += 1;
                let name = self.parse_property_name()?;
                node = Node::property(node, name);
            } else if token.is_symbol("[") && !token.spaced {
                self.index += 1;
                let index = self.parse_expression()?;
                self.expect_symbol("]")?;
                node = Node::Index {
                    object: Box::new(node),
                    index: Box::new(index),
                };
            } else if token.is_symbol("(") && !token.spaced {
                let Some(callee) = callee_path(&node) else {
                    return Err(self.error_here(
                        "PARSE_CALL_TARGET",
                        "Only named functions can be called.",
                    ));
                };
                self.index += 1;
                let args = self.parse_arguments(")")?;
                node = Node::Call { callee, args };
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_property_name(&mut self) -> Result<String, ErrorDescriptor> {
        match self.peek().map(|token| token.kind.clone()) {
            Some(TokenKind::Ident(name)) => {
                self.index += 1;
                Ok(name)
            }
            Some(TokenKind::AttrRef(name)) => {
                self.index += 1;
                Ok(format!("@{}", name))
            }
            _ => Err(self.error_here(
                "PARSE_EXPECTED_NAME",
                format!("Expected a property name but found {}.", self.describe_current()),
            )),
        }
    }

    pub(crate) fn parse_arguments(&mut self, close: &str) -> Result<Vec<Node>, ErrorDescriptor> {
        let mut args = Vec::new();
        if self.accept_symbol(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.accept_symbol(close) {
                return Ok(args);
            }
            self.expect_symbol(",")?;
        }
    }

    /// `name: expr, ...` pairs up to `close`, used by object literals and event details.
    pub(crate) fn parse_named_entries(
        &mut self,
        close: &str,
    ) -> Result<Vec<(String, Node)>, ErrorDescriptor> {
        let mut entries = Vec::new();
        if self.accept_symbol(close) {
            return Ok(entries);
        }
        loop {
            let key = match self.advance().map(|token| token.kind) {
                Some(TokenKind::Ident(name)) | Some(TokenKind::Str(name)) => name,
                _ => {
                    return Err(self.error_here(
                        "PARSE_EXPECTED_NAME",
                        "Expected an entry name.",
                    ))
                }
            };
            self.expect_symbol(":")?;
            entries.push((key, self.parse_expression()?));
            if self.accept_symbol(close) {
                return Ok(entries);
            }
            self.expect_symbol(",")?;
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ErrorDescriptor> {
        let Some(token) = self.advance() else {
            return Err(self.error_here("PARSE_UNEXPECTED_END", "Expected an expression."));
        };
        match token.kind {
            TokenKind::Number { value, unit } => Ok(Node::number(self.apply_unit(value, unit))),
            TokenKind::Str(value) => Ok(Node::string(value)),
            TokenKind::ClassRef(name) => Ok(Node::ClassRef { name }),
            TokenKind::IdRef(id) => Ok(Node::IdRef { id }),
            TokenKind::Query(selector) => Ok(Node::Query { selector }),
            TokenKind::AttrRef(name) => Ok(Node::AttributeRef { name }),
            TokenKind::Symbol("(") => {
                let inner = self.parse_expression()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            TokenKind::Symbol("[") => Ok(Node::Array {
                items: self.parse_arguments("]")?,
            }),
            TokenKind::Symbol("{") => Ok(Node::Object {
                entries: self.parse_named_entries("}")?,
            }),
            TokenKind::Ident(word) => self.parse_word(word),
            _ => {
                self.index -= 1;
                Err(self.error_here(
                    "PARSE_UNEXPECTED_TOKEN",
                    format!("Expected an expression but found {}.", self.describe_current()),
                ))
            }
        }
    }

    fn parse_word(&mut self, word: String) -> Result<Node, ErrorDescriptor> {
        match word.as_str() {
            "true" => Ok(Node::boolean(true)),
            "false" => Ok(Node::boolean(false)),
            "null" => Ok(Node::Literal {
                value: Literal::Null,
            }),
            "the" => self.parse_primary(),
            "I" => Ok(Node::identifier("me")),
            "my" | "its" | "your" => {
                let owner = match word.as_str() {
                    "my" => "me",
                    "its" => "it",
                    _ => "you",
                };
                let name = self.parse_property_name()?;
                Ok(Node::property(Node::identifier(owner), name))
            }
            "closest" => {
                let selector = match self.advance().map(|token| token.kind) {
                    Some(TokenKind::Query(selector)) => selector,
                    Some(TokenKind::ClassRef(name)) => format!(".{}", name),
                    Some(TokenKind::IdRef(id)) => format!("#{}", id),
                    _ => {
                        return Err(self.error_here(
                            "PARSE_CLOSEST_SELECTOR",
                            "Expected a selector after 'closest'.",
                        ))
                    }
                };
                Ok(Node::Closest { selector })
            }
            "first" | "last" => {
                let which = if word == "first" {
                    Positional::First
                } else {
                    Positional::Last
                };
                if !self.accept_ident("in") {
                    self.accept_ident("of");
                }
                let source = self.parse_postfix()?;
                Ok(Node::Positional {
                    which,
                    source: Box::new(source),
                })
            }
            _ => Ok(Node::identifier(word)),
        }
    }

    fn apply_unit(&mut self, value: f64, unit: Option<String>) -> f64 {
        match unit.as_deref() {
            Some("s") => return value * 1000.0,
            Some(_) => return value,
            None => {}
        }
        if self.accept_ident("seconds") || self.accept_ident("second") {
            return value * 1000.0;
        }
        if !self.accept_ident("milliseconds") {
            self.accept_ident("millisecond");
        }
        value
    }
}

fn callee_path(node: &Node) -> Option<String> {
    match node {
        Node::Identifier { name } => Some(name.clone()),
        Node::Property { object, name } => Some(format!("{}.{}", callee_path(object)?, name)),
        _ => None,
    }
}
