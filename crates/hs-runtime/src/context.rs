use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hs_core::{ControlSignal, ElementId, ErrorDescriptor, EventValue, Value};
use hs_dom::Dom;

/// Global variables shared by every context of one runtime.
pub type Globals = Rc<RefCell<BTreeMap<String, Value>>>;

/// Mirror of the last control signal seen by a frame.
///
/// Propagation happens through [`hs_core::Completion`] return values; these flags exist so
/// observers that inspect a context after the fact can see what happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextFlags {
    pub halted: bool,
    pub breaking: bool,
    pub continuing: bool,
    pub returning: bool,
    pub return_value: Option<Value>,
}

impl ContextFlags {
    /// Clears everything except `halted`, which is never cleared.
    pub fn begin_frame(&mut self) {
        let halted = self.halted;
        *self = Self {
            halted,
            ..Self::default()
        };
    }

    pub fn record(&mut self, signal: &ControlSignal) {
        match signal {
            ControlSignal::Break => self.breaking = true,
            ControlSignal::Continue => self.continuing = true,
            ControlSignal::Return(value) => {
                self.returning = true;
                self.return_value = Some(value.clone());
            }
            ControlSignal::Halt => self.halted = true,
        }
    }

    /// Called by the construct that absorbs a loop-scoped signal.
    pub fn clear_loop_signal(&mut self) {
        self.breaking = false;
        self.continuing = false;
    }
}

/// Scope of one execution frame: `me`/`you`/`it`, locals, shared globals and signal flags.
#[derive(Clone)]
pub struct ExecutionContext {
    pub me: Option<ElementId>,
    pub you: Option<ElementId>,
    pub it: Value,
    pub event: Option<EventValue>,
    pub locals: BTreeMap<String, Value>,
    pub flags: ContextFlags,
    /// Element commands act on when no explicit target is given.
    target: Option<ElementId>,
    globals: Globals,
    dom: Dom,
    errors: Rc<RefCell<Vec<ErrorDescriptor>>>,
}

impl ExecutionContext {
    pub fn new(dom: Dom, globals: Globals) -> Self {
        Self {
            me: None,
            you: None,
            it: Value::Undefined,
            event: None,
            locals: BTreeMap::new(),
            flags: ContextFlags::default(),
            target: None,
            globals,
            dom,
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_me(mut self, me: ElementId) -> Self {
        self.me = Some(me);
        self.target = Some(me);
        self
    }

    pub fn with_event(mut self, event: EventValue) -> Self {
        self.event = Some(event);
        self
    }

    /// Child context for a nested block. Locals are copied so writes stay in the child;
    /// globals and the error log are shared with the parent.
    pub fn derive(&self, me: Option<ElementId>, you: Option<ElementId>) -> Self {
        let me = me.or(self.me);
        let you = you.or(self.you);
        Self {
            me,
            you,
            it: self.it.clone(),
            event: self.event.clone(),
            locals: self.locals.clone(),
            flags: ContextFlags::default(),
            target: me,
            globals: Rc::clone(&self.globals),
            dom: self.dom.clone(),
            errors: Rc::clone(&self.errors),
        }
    }

    /// Context produced by `tell`: `you` is the told element and becomes the implicit target.
    pub fn derive_told(&self, told: ElementId) -> Self {
        let mut child = self.derive(None, Some(told));
        child.target = Some(told);
        child
    }

    /// Fresh frame for a function body: no inherited locals, parameters bound by the caller.
    pub fn derive_call(&self, params: BTreeMap<String, Value>) -> Self {
        let mut child = self.derive(None, None);
        child.locals = params;
        child.it = Value::Undefined;
        child
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn globals(&self) -> Globals {
        Rc::clone(&self.globals)
    }

    pub fn implicit_target(&self) -> Option<ElementId> {
        self.target
    }

    /// Resolution order: special names, then locals, then globals, then `undefined`.
    pub fn resolve(&self, name: &str) -> Value {
        match name {
            "me" | "I" => return element_or_undefined(self.me),
            "you" => return element_or_undefined(self.you),
            "it" | "result" => return self.it.clone(),
            "event" => {
                return self
                    .event
                    .clone()
                    .map(|event| Value::Event(Box::new(event)))
                    .unwrap_or_default()
            }
            _ => {}
        }
        if let Some(value) = self.locals.get(name) {
            return value.clone();
        }
        self.globals
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_special_name(name: &str) -> bool {
        matches!(name, "me" | "I" | "you" | "it" | "result" | "event")
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.borrow_mut().insert(name.to_string(), value);
    }

    /// Writes a variable. `$name` always targets globals; `it`/`result` write the result slot;
    /// everything else is a local of this frame.
    pub fn assign(&mut self, name: &str, value: Value) {
        if name.starts_with('$') {
            self.set_global(name, value);
            return;
        }
        if matches!(name, "it" | "result") {
            self.it = value;
            return;
        }
        self.set_local(name, value);
    }

    pub fn set_result(&mut self, value: Value) {
        self.it = value;
    }

    pub fn report_error(&self, error: ErrorDescriptor) {
        self.errors.borrow_mut().push(error);
    }

    pub fn errors(&self) -> Vec<ErrorDescriptor> {
        self.errors.borrow().clone()
    }

    /// Summary of the frame used in notification payloads.
    pub fn snapshot(&self) -> Value {
        let mut entries = BTreeMap::new();
        entries.insert("me".to_string(), element_or_undefined(self.me));
        entries.insert("you".to_string(), element_or_undefined(self.you));
        entries.insert("it".to_string(), self.it.clone());
        entries.insert("locals".to_string(), Value::Object(self.locals.clone()));
        Value::Object(entries)
    }
}

fn element_or_undefined(element: Option<ElementId>) -> Value {
    element.map(Value::Element).unwrap_or_default()
}

#[cfg(test)]
mod context_tests {
    use super::*;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Dom::default(), Globals::default())
    }

    #[test]
    fn locals_shadow_globals_and_missing_names_are_undefined() {
        let mut ctx = context();
        ctx.set_global("x", Value::Number(1.0));
        assert_eq!(ctx.resolve("x"), Value::Number(1.0));
        ctx.set_local("x", Value::Number(2.0));
        assert_eq!(ctx.resolve("x"), Value::Number(2.0));
        assert_eq!(ctx.resolve("missing"), Value::Undefined);
    }

    #[test]
    fn derived_context_writes_do_not_leak_into_parent() {
        let mut parent = context();
        parent.set_global("x", Value::Number(1.0));
        parent.set_local("x", Value::Number(2.0));

        let mut child = parent.derive(None, None);
        assert_eq!(child.resolve("x"), Value::Number(2.0));
        child.set_local("x", Value::Number(3.0));
        child.assign("$shared", Value::Boolean(true));

        assert_eq!(child.resolve("x"), Value::Number(3.0));
        assert_eq!(parent.resolve("x"), Value::Number(2.0));
        assert_eq!(parent.resolve("$shared"), Value::Boolean(true));
    }

    #[test]
    fn special_names_short_circuit_before_locals() {
        let me = ElementId(4);
        let mut ctx = context().with_me(me);
        ctx.set_local("me", Value::string("shadow"));
        ctx.set_result(Value::Number(9.0));
        assert_eq!(ctx.resolve("me"), Value::Element(me));
        assert_eq!(ctx.resolve("I"), Value::Element(me));
        assert_eq!(ctx.resolve("result"), Value::Number(9.0));
        assert_eq!(ctx.resolve("you"), Value::Undefined);
        assert_eq!(ctx.resolve("event"), Value::Undefined);
    }

    #[test]
    fn told_context_targets_you_but_keeps_me() {
        let ctx = context().with_me(ElementId(1));
        let told = ctx.derive_told(ElementId(2));
        assert_eq!(told.me, Some(ElementId(1)));
        assert_eq!(told.you, Some(ElementId(2)));
        assert_eq!(told.implicit_target(), Some(ElementId(2)));
        assert_eq!(ctx.implicit_target(), Some(ElementId(1)));
    }

    #[test]
    fn errors_are_shared_across_derived_contexts() {
        let parent = context();
        let child = parent.derive(None, None);
        child.report_error(ErrorDescriptor::runtime("E", "boom"));
        assert_eq!(parent.errors().len(), 1);
    }

    #[test]
    fn halted_survives_frame_reset() {
        let mut flags = ContextFlags::default();
        flags.record(&ControlSignal::Break);
        flags.record(&ControlSignal::Halt);
        flags.begin_frame();
        assert!(flags.halted);
        assert!(!flags.breaking);

        flags.record(&ControlSignal::Return(Value::Number(1.0)));
        assert!(flags.returning);
        assert_eq!(flags.return_value, Some(Value::Number(1.0)));
    }
}
