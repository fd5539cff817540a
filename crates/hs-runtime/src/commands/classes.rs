use futures_util::future::LocalBoxFuture;
use hs_core::{BinaryOp, CommandNode, CommandResult, Completion, ElementId, ErrorDescriptor, Node, Value};
use hs_dom::Document;

use super::{ready, require_args, targets_or_default};
use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::protocol::{ArgMode, Command, CommandInput, ValidationReport};
use crate::resolver::resolve_targets;

/// One operand of `add`/`remove`/`toggle`.
#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Class(String),
    Attribute { name: String, value: Option<String> },
}

fn is_class_item(node: &Node) -> bool {
    match node {
        Node::ClassRef { .. } | Node::AttributeRef { .. } => true,
        Node::Literal { value } => matches!(value, hs_core::Literal::String(_)),
        Node::Binary {
            op: BinaryOp::Equal,
            left,
            ..
        } => matches!(left.as_ref(), Node::AttributeRef { .. }),
        _ => false,
    }
}

fn class_items(
    evaluator: &Evaluator,
    ctx: &ExecutionContext,
    nodes: &[Node],
) -> Result<Vec<ClassItem>, ErrorDescriptor> {
    let mut items = Vec::new();
    for node in nodes {
        match node {
            Node::ClassRef { name } => items.push(ClassItem::Class(name.clone())),
            Node::AttributeRef { name } => items.push(ClassItem::Attribute {
                name: name.clone(),
                value: None,
            }),
            Node::Binary {
                op: BinaryOp::Equal,
                left,
                right,
            } if matches!(left.as_ref(), Node::AttributeRef { .. }) => {
                let Node::AttributeRef { name } = left.as_ref() else {
                    continue;
                };
                items.push(ClassItem::Attribute {
                    name: name.clone(),
                    value: Some(evaluator.evaluate(right, ctx)?.to_text()),
                });
            }
            other => match evaluator.evaluate(other, ctx)? {
                Value::String(text) => items.extend(
                    text.split_whitespace()
                        .map(|class| ClassItem::Class(class.trim_start_matches('.').to_string())),
                ),
                value => {
                    return Err(ErrorDescriptor::type_mismatch(
                        "CMD_CLASS_EXPECTED",
                        format!("Expected a class name but got {}.", value.type_name()),
                    )
                    .suggest("Write classes as .name or as a string such as 'a b'."))
                }
            },
        }
    }
    Ok(items)
}

fn class_usage(name: &str, preposition: &str) -> String {
    format!("{} .class [{} <target>]", name, preposition)
}

pub struct AddCommand;

impl Command for AddCommand {
    fn name(&self) -> &'static str {
        "add"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, &class_usage("add", "to"))
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(apply_items(ctx, &input, "to", "added", |doc, target, item| match item {
            ClassItem::Class(name) => {
                doc.add_class(target, name);
            }
            ClassItem::Attribute { name, value } => {
                doc.set_attribute(target, name, value.as_deref().unwrap_or_default());
            }
        }))
    }
}

pub struct ToggleCommand;

impl Command for ToggleCommand {
    fn name(&self) -> &'static str {
        "toggle"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, &class_usage("toggle", "on"))
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(apply_items(ctx, &input, "on", "toggled", |doc, target, item| match item {
            ClassItem::Class(name) => {
                doc.toggle_class(target, name);
            }
            ClassItem::Attribute { name, value } => {
                if doc.has_attribute(target, name) {
                    doc.remove_attribute(target, name);
                } else {
                    doc.set_attribute(target, name, value.as_deref().unwrap_or_default());
                }
            }
        }))
    }
}

/// `remove .class [from <target>]` edits classes; `remove <element>` detaches elements.
pub struct RemoveCommand;

impl Command for RemoveCommand {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Lazy
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, "remove .class [from <target>] | remove <element>")
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        if input.node.args.iter().all(is_class_item) {
            return ready(apply_items(ctx, &input, "from", "removed", |doc, target, item| {
                match item {
                    ClassItem::Class(name) => {
                        doc.remove_class(target, name);
                    }
                    ClassItem::Attribute { name, .. } => {
                        doc.remove_attribute(target, name);
                    }
                }
            }));
        }
        ready(detach(ctx, &input))
    }
}

fn apply_items(
    ctx: &mut ExecutionContext,
    input: &CommandInput<'_>,
    preposition: &str,
    verb: &str,
    apply: impl Fn(&mut Document, ElementId, &ClassItem),
) -> CommandResult {
    let command = input.node.name.as_str();
    let items = class_items(input.evaluator, ctx, &input.node.args)?;
    let targets = targets_or_default(ctx, input.evaluator, input.modifier_node(preposition), command)?;
    ctx.dom().write(|doc| {
        for target in &targets {
            for item in &items {
                apply(doc, *target, item);
            }
        }
    });
    let result = Value::ElementList(targets.clone());
    input
        .evaluator
        .notifier()
        .notify(ctx, command, verb, &targets, &result);
    Ok(Completion::Normal(result))
}

fn detach(ctx: &mut ExecutionContext, input: &CommandInput<'_>) -> CommandResult {
    let mut targets = Vec::new();
    for node in &input.node.args {
        let value = input.evaluator.evaluate(node, ctx)?;
        targets.extend(resolve_targets(ctx, &value));
    }
    ctx.dom().write(|doc| {
        for target in &targets {
            doc.remove(*target);
        }
    });
    let result = Value::ElementList(targets.clone());
    input
        .evaluator
        .notifier()
        .notify(ctx, "remove", "removed", &targets, &result);
    Ok(Completion::Normal(result))
}
