use std::sync::OnceLock;

use futures_util::future::{FutureExt, LocalBoxFuture};
use hs_core::{
    CommandNode, CommandResult, Completion, ElementId, ErrorDescriptor, InsertPosition, Node, Value,
};
use hs_dom::Document;
use log::info;
use regex::Regex;

use super::{ready, require_args};
use crate::context::ExecutionContext;
use crate::evaluator::replace_inner_html;
use crate::protocol::{ArgMode, Command, CommandInput, ValidationReport};
use crate::resolver::require_targets;

fn position_regex() -> &'static Regex {
    static POSITION: OnceLock<Regex> = OnceLock::new();
    POSITION.get_or_init(|| {
        Regex::new(r"\b(into|before|after|at\s+(?:the\s+)?(?:start|beginning|end)\s+of)\b")
            .expect("position regex must compile")
    })
}

/// Position keyword found in raw source, for nodes built without a structured position.
pub(crate) fn sniff_position(source: &str) -> Option<InsertPosition> {
    let found = position_regex().find(source)?.as_str();
    InsertPosition::from_keyword(&found.replace("beginning", "start"))
}

fn put_position(node: &CommandNode) -> Option<InsertPosition> {
    node.position
        .or_else(|| node.modifiers.keys().find_map(|key| InsertPosition::from_keyword(key)))
        .or_else(|| sniff_position(&node.source))
}

fn put_destination(node: &CommandNode, position: InsertPosition) -> Option<&Node> {
    node.modifiers
        .get(position.keyword())
        .or_else(|| {
            node.modifiers
                .iter()
                .find(|(key, _)| InsertPosition::from_keyword(key).is_some())
                .map(|(_, target)| target)
        })
        .or_else(|| node.args.get(1))
}

/// Destinations written as variables or properties are assigned rather than inserted into.
fn is_value_place(node: &Node) -> bool {
    match node {
        Node::Identifier { name } => !matches!(name.as_str(), "me" | "I" | "you"),
        Node::Property { .. } | Node::Index { .. } | Node::AttributeRef { .. } => true,
        _ => false,
    }
}

pub struct PutCommand;

impl Command for PutCommand {
    fn name(&self) -> &'static str {
        "put"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        let usage = "put <value> into|before|after|at start of|at end of <target>";
        let mut report = require_args(node, 1, usage);
        match put_position(node) {
            None => report.push(
                ErrorDescriptor::syntax(
                    "CMD_PUT_POSITION",
                    "'put' needs a position keyword before its target.",
                )
                .suggest_all(["into", "before", "after", "at start of", "at end of"]),
            ),
            Some(position) if put_destination(node, position).is_none() => {
                report.push(ErrorDescriptor::missing_argument(
                    "CMD_MISSING_ARGUMENT",
                    format!("'put ... {}' is missing its target.", position.keyword()),
                ))
            }
            Some(_) => {}
        }
        report
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(put(ctx, &input))
    }
}

fn put(ctx: &mut ExecutionContext, input: &CommandInput<'_>) -> CommandResult {
    let node = input.node;
    let evaluator = input.evaluator;
    let position = put_position(node).ok_or_else(|| {
        ErrorDescriptor::syntax("CMD_PUT_POSITION", "'put' needs a position keyword.")
    })?;
    let destination = put_destination(node, position).ok_or_else(|| {
        ErrorDescriptor::missing_argument("CMD_MISSING_ARGUMENT", "'put' is missing its target.")
    })?;
    let value = match node.args.first() {
        Some(content) => evaluator.evaluate(content, ctx)?,
        None => Value::Undefined,
    };

    if position == InsertPosition::Into && is_value_place(destination) {
        let changed = evaluator.assign(destination, value.clone(), ctx)?;
        evaluator
            .notifier()
            .notify(ctx, "put", "put", &changed, &value);
        return Ok(Completion::Normal(value));
    }

    let target_value = evaluator.evaluate(destination, ctx)?;
    let targets = require_targets(ctx, &target_value, "put")?;
    let moved = match &value {
        Value::Element(id) => Some(vec![*id]),
        Value::ElementList(ids) => Some(ids.clone()),
        _ => None,
    };
    ctx.dom().write(|doc| {
        for target in &targets {
            match &moved {
                Some(elements) => insert_nodes(doc, *target, position, elements),
                None if position == InsertPosition::Into => {
                    replace_inner_html(doc, *target, &value.to_text())
                }
                None => {
                    let nodes = content_nodes(doc, &value.to_text());
                    insert_nodes(doc, *target, position, &nodes);
                }
            }
        }
    });
    evaluator
        .notifier()
        .notify(ctx, "put", "put", &targets, &value);
    Ok(Completion::Normal(value))
}

/// Markup text becomes element nodes; anything else is a single text node.
fn content_nodes(doc: &mut Document, text: &str) -> Vec<ElementId> {
    if text.contains('<') {
        if let Ok(nodes) = doc.parse_fragment(text) {
            return nodes;
        }
    }
    vec![doc.create_text(text)]
}

fn insert_nodes(doc: &mut Document, target: ElementId, position: InsertPosition, nodes: &[ElementId]) {
    match position {
        InsertPosition::Into => {
            doc.clear_children(target);
            for node in nodes {
                doc.append_child(target, *node);
            }
        }
        InsertPosition::AtEnd => {
            for node in nodes {
                doc.append_child(target, *node);
            }
        }
        InsertPosition::AtStart => {
            for node in nodes.iter().rev() {
                doc.prepend_child(target, *node);
            }
        }
        InsertPosition::Before => {
            for node in nodes {
                doc.insert_before(target, *node);
            }
        }
        InsertPosition::After => {
            for node in nodes.iter().rev() {
                doc.insert_after(target, *node);
            }
        }
    }
}

/// `get <expr>` and `call <expr>`: evaluate, invoking a `def` function when one is named.
pub struct GetCommand {
    name: &'static str,
}

impl GetCommand {
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Command for GetCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, &format!("{} <expression>", self.name))
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let Some(expression) = input.node.args.first() else {
                return Ok(Completion::undefined());
            };
            input.evaluator.evaluate_invocation(expression, ctx).await
        }
        .boxed_local()
    }
}

pub struct LogCommand;

impl Command for LogCommand {
    fn name(&self) -> &'static str {
        "log"
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, "log <expression>[, <expression>]")
    }

    fn execute<'a>(
        &'a self,
        _ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        let line = input
            .args
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join(" ");
        info!("{}", line);
        ready(Ok(Completion::Normal(Value::Undefined)))
    }
}
