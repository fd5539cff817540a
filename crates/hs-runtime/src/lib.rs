//! Evaluation core: execution contexts, target resolution, the command/expression protocol,
//! the evaluator that dispatches commands, and the builtin command catalog.

pub mod commands;
pub mod context;
pub mod evaluator;
pub mod functions;
pub mod notify;
pub mod options;
pub mod protocol;
pub mod resolver;

pub use context::{ContextFlags, ExecutionContext, Globals};
pub use evaluator::{BoundaryOutcome, Evaluator, FunctionDef};
pub use functions::BuiltinFunction;
pub use notify::Notifier;
pub use options::{ErrorPolicy, RuntimeOptions};
pub use protocol::{
    similar_names, ArgMode, Command, CommandInput, CommandRegistry, Expression,
    ExpressionRegistry, ValidationReport,
};
pub use resolver::{require_targets, resolve_targets};
