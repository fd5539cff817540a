use hs_core::{infer_type, ErrorDescriptor, EvalResult, Node, Value};

use crate::context::ExecutionContext;
use crate::evaluator::get_property;
use crate::protocol::{Expression, ExpressionRegistry, ValidationReport};

type Evaluate = fn(&ExecutionContext, &[Value]) -> EvalResult;

/// Builtin expression function with a fixed arity range.
pub struct BuiltinFunction {
    name: &'static str,
    min_args: usize,
    max_args: usize,
    evaluate: Evaluate,
}

impl BuiltinFunction {
    pub const fn new(name: &'static str, min_args: usize, max_args: usize, evaluate: Evaluate) -> Self {
        Self {
            name,
            min_args,
            max_args,
            evaluate,
        }
    }
}

impl Expression for BuiltinFunction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(&self, args: &[Node]) -> ValidationReport {
        if args.len() < self.min_args {
            return ValidationReport::error(ErrorDescriptor::missing_argument(
                "FN_MISSING_ARGUMENT",
                format!(
                    "{}() needs at least {} argument(s) but got {}.",
                    self.name,
                    self.min_args,
                    args.len()
                ),
            ));
        }
        if args.len() > self.max_args {
            return ValidationReport::error(ErrorDescriptor::invalid_argument(
                "FN_TOO_MANY_ARGUMENTS",
                format!(
                    "{}() takes at most {} argument(s) but got {}.",
                    self.name,
                    self.max_args,
                    args.len()
                ),
            ));
        }
        ValidationReport::ok()
    }

    fn evaluate(&self, ctx: &ExecutionContext, args: &[Value]) -> EvalResult {
        (self.evaluate)(ctx, args)
    }
}

pub fn register_builtins(registry: &mut ExpressionRegistry) {
    registry.register(BuiltinFunction::new("length", 1, 1, |ctx, args| {
        Ok(match get_property(ctx, &args[0], "length") {
            Value::Undefined => Value::Number(0.0),
            length => length,
        })
    }));
    registry.register(BuiltinFunction::new("first", 1, 1, |ctx, args| {
        Ok(get_property(ctx, &args[0], "first"))
    }));
    registry.register(BuiltinFunction::new("last", 1, 1, |ctx, args| {
        Ok(get_property(ctx, &args[0], "last"))
    }));
    registry.register(BuiltinFunction::new("number", 1, 1, |_, args| {
        args[0].to_number().map(Value::Number).ok_or_else(|| {
            ErrorDescriptor::type_mismatch(
                "FN_NOT_A_NUMBER",
                format!("'{}' cannot be read as a number.", args[0].to_text()),
            )
        })
    }));
    registry.register(BuiltinFunction::new("string", 1, 1, |_, args| {
        Ok(Value::String(args[0].to_text()))
    }));
    registry.register(BuiltinFunction::new("typeOf", 1, 1, |_, args| {
        Ok(Value::string(infer_type(&args[0]).as_str()))
    }));
    registry.register(BuiltinFunction::new("round", 1, 2, |_, args| {
        let value = args[0].to_number().ok_or_else(|| {
            ErrorDescriptor::type_mismatch(
                "FN_NOT_A_NUMBER",
                format!("round() needs a number but got {}.", args[0].type_name()),
            )
        })?;
        let digits = args.get(1).and_then(Value::to_number).unwrap_or(0.0);
        if !(0.0..=10.0).contains(&digits) || digits.fract() != 0.0 {
            return Err(ErrorDescriptor::invalid_argument(
                "FN_BAD_PRECISION",
                "round() precision must be a whole number between 0 and 10.",
            ));
        }
        let scale = 10f64.powi(digits as i32);
        Ok(Value::Number((value * scale).round() / scale))
    }));
}

#[cfg(test)]
mod functions_tests {
    use hs_core::ErrorKind;
    use hs_dom::Dom;

    use super::*;
    use crate::context::Globals;
    use crate::evaluator::Evaluator;
    use crate::options::RuntimeOptions;

    fn eval(source: &str) -> EvalResult {
        let ctx = ExecutionContext::new(Dom::default(), Globals::default());
        let node = hs_parser::parse_expression(source).expect("expression should parse");
        Evaluator::new(RuntimeOptions::default()).evaluate(&node, &ctx)
    }

    #[test]
    fn builtins_compute_over_values() {
        assert_eq!(eval("length([1, 2, 3])").expect("length"), Value::Number(3.0));
        assert_eq!(eval("length(null)").expect("length of null"), Value::Number(0.0));
        assert_eq!(eval("first('abc')").expect("first"), Value::string("a"));
        assert_eq!(eval("number('4.5')").expect("number"), Value::Number(4.5));
        assert_eq!(eval("string(12)").expect("string"), Value::string("12"));
        assert_eq!(eval("typeOf({a: 1})").expect("typeOf"), Value::string("object"));
        assert_eq!(eval("round(3.14159, 2)").expect("round"), Value::Number(3.14));
    }

    #[test]
    fn arity_is_checked_before_evaluation() {
        let error = eval("length()").expect_err("missing");
        assert_eq!(error.kind, ErrorKind::MissingArgument);
        let error = eval("string(1, 2)").expect_err("too many");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
        let error = eval("number('abc')").expect_err("not numeric");
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn unknown_function_suggests_close_names() {
        let error = eval("lenght([1])").expect_err("unknown");
        assert_eq!(error.kind, ErrorKind::ValidationError);
        assert!(error.suggestions.iter().any(|hint| hint.contains("length")));
    }
}
