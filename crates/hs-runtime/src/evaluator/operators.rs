use std::cmp::Ordering;

use hs_core::{BinaryOp, ErrorDescriptor, EvalResult, UnaryOp, Value};
use regex::Regex;

use crate::context::ExecutionContext;

pub fn apply_unary(op: UnaryOp, operand: &Value) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOp::Negate => {
            let value = operand
                .to_number()
                .ok_or_else(|| not_a_number("-", operand))?;
            Ok(Value::Number(-value))
        }
    }
}

/// Non-logical binary operators. `and`/`or` short-circuit in the evaluator and never get here.
pub fn apply_binary(ctx: &ExecutionContext, op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left.to_text(), right.to_text())))
        }
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            arithmetic(op, left, right)
        }
        BinaryOp::Equal => Ok(Value::Boolean(left.loose_equals(right))),
        BinaryOp::NotEqual => Ok(Value::Boolean(!left.loose_equals(right))),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = compare(op, left, right)?;
            Ok(Value::Boolean(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Contains => contains(ctx, left, right).map(Value::Boolean),
        BinaryOp::Matches => matches_pattern(ctx, left, right).map(Value::Boolean),
        BinaryOp::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
    }
}

fn not_a_number(symbol: &str, value: &Value) -> ErrorDescriptor {
    ErrorDescriptor::type_mismatch(
        "EVAL_NOT_A_NUMBER",
        format!(
            "Operator '{}' needs numbers but got {} ({}).",
            symbol,
            value.type_name(),
            value.to_text()
        ),
    )
    .suggest("Convert the operand first, e.g. number(x).")
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let symbol = op.symbol();
    let a = left.to_number().ok_or_else(|| not_a_number(symbol, left))?;
    let b = right.to_number().ok_or_else(|| not_a_number(symbol, right))?;
    if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b == 0.0 {
        return Err(ErrorDescriptor::runtime(
            "EVAL_DIVISION_BY_ZERO",
            format!("{} {} 0 has no defined result.", left.to_text(), symbol),
        )
        .suggest("Guard the divisor, e.g. 'if n is not 0'."));
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        _ => a % b,
    };
    if !result.is_finite() {
        return Err(ErrorDescriptor::runtime(
            "EVAL_NUMBER_OVERFLOW",
            format!("{} {} {} overflows.", a, symbol, b),
        ));
    }
    Ok(Value::Number(result))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, ErrorDescriptor> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    let symbol = op.symbol();
    let a = left.to_number().ok_or_else(|| not_a_number(symbol, left))?;
    let b = right.to_number().ok_or_else(|| not_a_number(symbol, right))?;
    // Both operands are finite, so partial_cmp always succeeds.
    Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
}

fn contains(ctx: &ExecutionContext, container: &Value, item: &Value) -> Result<bool, ErrorDescriptor> {
    match (container, item) {
        (Value::String(text), _) => Ok(text.contains(&item.to_text())),
        (Value::Array(items), _) => Ok(items.iter().any(|entry| entry.loose_equals(item))),
        (Value::Object(entries), Value::String(key)) => Ok(entries.contains_key(key)),
        (Value::ElementList(ids), Value::Element(id)) => Ok(ids.contains(id)),
        (Value::Element(ancestor), Value::Element(node)) => Ok(ctx.dom().read(|doc| {
            let mut cursor = Some(*node);
            while let Some(current) = cursor {
                if current == *ancestor {
                    return true;
                }
                cursor = doc.parent(current);
            }
            false
        })),
        (Value::Null | Value::Undefined, _) => Ok(false),
        _ => Err(ErrorDescriptor::type_mismatch(
            "EVAL_CONTAINS_UNSUPPORTED",
            format!(
                "'contains' cannot look for {} inside {}.",
                item.type_name(),
                container.type_name()
            ),
        )),
    }
}

fn matches_pattern(ctx: &ExecutionContext, subject: &Value, pattern: &Value) -> Result<bool, ErrorDescriptor> {
    let pattern_text = pattern.to_text();
    match subject {
        Value::Element(id) => {
            let selector = crate::resolver::normalize_selector(&pattern_text);
            ctx.dom().read(|doc| doc.matches(*id, selector))
        }
        Value::ElementList(ids) => {
            let selector = crate::resolver::normalize_selector(&pattern_text);
            ctx.dom().read(|doc| {
                for id in ids {
                    if !doc.matches(*id, selector)? {
                        return Ok(false);
                    }
                }
                Ok(!ids.is_empty())
            })
        }
        Value::Null | Value::Undefined => Ok(false),
        other => {
            let regex = Regex::new(&pattern_text).map_err(|error| {
                ErrorDescriptor::invalid_argument(
                    "EVAL_BAD_PATTERN",
                    format!("'{}' is not a valid pattern: {}", pattern_text, error),
                )
            })?;
            Ok(regex.is_match(&other.to_text()))
        }
    }
}
