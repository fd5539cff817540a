use std::collections::BTreeMap;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use hs_core::{CommandNode, CommandResult, ErrorDescriptor, EvalResult, Node, Value};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;

/// How the dispatcher prepares a command's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// Arguments and modifiers are evaluated before `execute` runs.
    Eager,
    /// The command evaluates its own operands (places, class refs, conditions, blocks).
    Lazy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ErrorDescriptor>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(error: ErrorDescriptor) -> Self {
        Self {
            errors: vec![error],
            suggestions: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, error: ErrorDescriptor) {
        self.errors.push(error);
    }

    /// First error, carrying every report-level suggestion.
    pub fn into_result(self) -> Result<(), ErrorDescriptor> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(error) => Err(error.suggest_all(self.suggestions)),
        }
    }
}

/// Operands handed to [`Command::execute`]. For lazy commands `args` and `modifiers` are empty
/// and the command reads `node` directly.
pub struct CommandInput<'a> {
    pub node: &'a CommandNode,
    pub args: Vec<Value>,
    pub modifiers: BTreeMap<String, Value>,
    pub evaluator: &'a Evaluator,
}

impl<'a> CommandInput<'a> {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn modifier(&self, keyword: &str) -> Option<&Value> {
        self.modifiers.get(keyword)
    }

    pub fn modifier_node(&self, keyword: &str) -> Option<&'a Node> {
        self.node.modifiers.get(keyword)
    }
}

/// A leaf command. `validate` is pure; side effects happen only in `execute`.
pub trait Command {
    fn name(&self) -> &'static str;

    fn arg_mode(&self) -> ArgMode {
        ArgMode::Eager
    }

    fn validate(&self, _node: &CommandNode) -> ValidationReport {
        ValidationReport::ok()
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult>;
}

/// A named, synchronous expression function such as `length(x)`.
pub trait Expression {
    fn name(&self) -> &'static str;

    fn validate(&self, _args: &[Node]) -> ValidationReport {
        ValidationReport::ok()
    }

    fn evaluate(&self, ctx: &ExecutionContext, args: &[Value]) -> EvalResult;
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Rc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::commands::register_builtins(&mut registry);
        registry
    }

    /// Registers `command`, replacing any command with the same name.
    pub fn register(&mut self, command: impl Command + 'static) {
        self.commands
            .insert(command.name().to_string(), Rc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

#[derive(Clone, Default)]
pub struct ExpressionRegistry {
    expressions: BTreeMap<String, Rc<dyn Expression>>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::functions::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, expression: impl Expression + 'static) {
        self.expressions
            .insert(expression.name().to_string(), Rc::new(expression));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Expression>> {
        self.expressions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.expressions.keys().cloned().collect()
    }
}

/// Candidates within a small edit distance of `name`, closest first.
pub fn similar_names<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let limit = if name.chars().count() <= 3 { 1 } else { 2 };
    let mut scored = candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, candidate)| *distance <= limit || candidate.starts_with(name))
        .collect::<Vec<_>>();
    scored.sort();
    scored
        .into_iter()
        .take(3)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

fn edit_distance(left: &str, right: &str) -> usize {
    let right_chars = right.chars().collect::<Vec<_>>();
    let mut previous = (0..=right_chars.len()).collect::<Vec<_>>();
    for (row, left_char) in left.chars().enumerate() {
        let mut current = vec![row + 1];
        for (column, right_char) in right_chars.iter().enumerate() {
            let substitution = previous[column] + usize::from(left_char != *right_char);
            let insertion = current[column] + 1;
            let deletion = previous[column + 1] + 1;
            current.push(substitution.min(insertion).min(deletion));
        }
        previous = current;
    }
    previous[right_chars.len()]
}
