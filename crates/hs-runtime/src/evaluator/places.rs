use hs_core::{ElementId, ErrorDescriptor, Node, Value};

use super::properties::{kebab_case, object_with, set_element_property};
use super::Evaluator;
use crate::context::ExecutionContext;
use crate::resolver::resolve_targets;

impl Evaluator {
    /// Writes `value` into an assignable place and returns the elements that changed.
    ///
    /// Places are variables, `@attr` on the implicit target, element properties (including
    /// `style.x` and `dataset.x`), and fields or indexes of objects and arrays held in variables.
    pub fn assign(
        &self,
        place: &Node,
        value: Value,
        ctx: &mut ExecutionContext,
    ) -> Result<Vec<ElementId>, ErrorDescriptor> {
        match place {
            Node::Identifier { name } if matches!(name.as_str(), "me" | "I" | "you" | "event") => {
                Err(not_assignable(&format!("'{}'", name)))
            }
            Node::Identifier { name } => {
                ctx.assign(name, value);
                Ok(Vec::new())
            }
            Node::AttributeRef { name } => {
                let Some(target) = ctx.implicit_target() else {
                    return Err(ErrorDescriptor::context(
                        "EVAL_NO_TARGET",
                        format!("@{} needs an element but no 'me' is set.", name),
                    ));
                };
                let property = format!("@{}", name);
                ctx.dom()
                    .write(|doc| set_element_property(doc, target, &property, &value))?;
                Ok(vec![target])
            }
            Node::Property { object, name } => self.assign_property(object, name, value, ctx),
            Node::Index { object, index } => {
                let base = self.evaluate(object, ctx)?;
                let key = self.evaluate(index, ctx)?;
                let updated = match base {
                    Value::Array(mut items) => {
                        // Writes may replace an item or append one; anything further is rejected.
                        let Some(at) = key
                            .to_number()
                            .filter(|at| *at >= 0.0 && at.fract() == 0.0)
                            .filter(|at| *at <= items.len() as f64)
                        else {
                            return Err(ErrorDescriptor::invalid_argument(
                                "EVAL_BAD_INDEX",
                                format!("{} is not a valid array index.", key.to_text()),
                            )
                            .suggest(format!(
                                "Use an index from 0 to {} for this array.",
                                items.len()
                            )));
                        };
                        let at = at as usize;
                        if at == items.len() {
                            items.push(value);
                        } else {
                            items[at] = value;
                        }
                        Value::Array(items)
                    }
                    other => object_with(&other, &key.to_text(), value)
                        .ok_or_else(|| not_assignable(&format!("an index of {}", other.type_name())))?,
                };
                self.assign(object, updated, ctx)
            }
            other => Err(not_assignable(&describe(other))),
        }
    }

    fn assign_property(
        &self,
        object: &Node,
        name: &str,
        value: Value,
        ctx: &mut ExecutionContext,
    ) -> Result<Vec<ElementId>, ErrorDescriptor> {
        if let Node::Property {
            object: owner,
            name: view,
        } = object
        {
            if matches!(view.as_str(), "style" | "dataset") {
                let owner_value = self.evaluate(owner, ctx)?;
                if matches!(owner_value, Value::Element(_) | Value::ElementList(_)) {
                    let targets = resolve_targets(ctx, &owner_value);
                    let text = if value.is_nullish() {
                        String::new()
                    } else {
                        value.to_text()
                    };
                    ctx.dom().write(|doc| {
                        for target in &targets {
                            if view == "style" {
                                doc.set_style_property(*target, name, &text);
                            } else if text.is_empty() {
                                doc.remove_attribute(*target, &format!("data-{}", kebab_case(name)));
                            } else {
                                doc.set_attribute(*target, &format!("data-{}", kebab_case(name)), &text);
                            }
                        }
                    });
                    return Ok(targets);
                }
            }
        }

        let base = self.evaluate(object, ctx)?;
        match &base {
            Value::Element(_) | Value::ElementList(_) => {
                let targets = resolve_targets(ctx, &base);
                ctx.dom().write(|doc| {
                    targets
                        .iter()
                        .try_for_each(|target| set_element_property(doc, *target, name, &value))
                })?;
                Ok(targets)
            }
            _ => {
                let updated = object_with(&base, name, value)
                    .ok_or_else(|| not_assignable(&format!("a property of {}", base.type_name())))?;
                self.assign(object, updated, ctx)
            }
        }
    }
}

fn not_assignable(what: &str) -> ErrorDescriptor {
    ErrorDescriptor::invalid_argument(
        "EVAL_NOT_ASSIGNABLE",
        format!("Cannot assign to {}.", what),
    )
    .suggest("Assign to a variable, an @attribute, or an element property such as 'my textContent'.")
}

fn describe(node: &Node) -> String {
    match node {
        Node::Literal { .. } => "a literal".to_string(),
        Node::ClassRef { name } => format!(".{}", name),
        Node::IdRef { id } => format!("#{}", id),
        Node::Query { selector } => selector.clone(),
        Node::Call { callee, .. } => format!("the result of {}()", callee),
        _ => "this expression".to_string(),
    }
}
