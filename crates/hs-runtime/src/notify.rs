use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use hs_core::{ElementId, Value};
use log::trace;

use crate::context::ExecutionContext;
use crate::options::RuntimeOptions;

/// Dispatches `"<namespace>:<verb>"` events on elements a command changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notifier {
    namespace: String,
    enabled: bool,
}

impl Notifier {
    pub fn new(namespace: impl Into<String>, enabled: bool) -> Self {
        Self {
            namespace: namespace.into(),
            enabled,
        }
    }

    pub fn from_options(options: &RuntimeOptions) -> Self {
        Self::new(
            options.notification_namespace.clone(),
            options.emit_notifications,
        )
    }

    pub fn event_name(&self, verb: &str) -> String {
        format!("{}:{}", self.namespace, verb)
    }

    /// One non-bubbling event per element, after the mutation happened.
    pub fn notify(
        &self,
        ctx: &ExecutionContext,
        command: &str,
        verb: &str,
        elements: &[ElementId],
        result: &Value,
    ) {
        if !self.enabled || elements.is_empty() {
            return;
        }
        let name = self.event_name(verb);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as f64)
            .unwrap_or_default();
        let context = ctx.snapshot();
        for element in elements {
            let mut detail = BTreeMap::new();
            detail.insert("element".to_string(), Value::Element(*element));
            detail.insert("context".to_string(), context.clone());
            detail.insert("command".to_string(), Value::string(command));
            detail.insert("timestamp".to_string(), Value::Number(timestamp));
            detail.insert("result".to_string(), result.clone());
            ctx.dom()
                .dispatch_event(*element, &name, Value::Object(detail), false);
        }
        trace!("notified {} on {} element(s)", name, elements.len());
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_options(&RuntimeOptions::default())
    }
}

#[cfg(test)]
mod notify_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use hs_dom::Dom;

    use super::*;
    use crate::context::Globals;

    #[test]
    fn notification_carries_detail_and_does_not_bubble() {
        let dom = Dom::default();
        let (parent, child) = dom.write(|doc| {
            let parent = doc.create_element("div");
            let child = doc.create_element("span");
            doc.append_child(doc.root(), parent);
            doc.append_child(parent, child);
            (parent, child)
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_on_child = Rc::clone(&seen);
        dom.add_event_listener(child, "hyperscript:added", move |event| {
            seen_on_child.borrow_mut().push(event.detail.clone());
        });
        let seen_on_parent = Rc::clone(&seen);
        dom.add_event_listener(parent, "hyperscript:added", move |event| {
            seen_on_parent.borrow_mut().push(event.detail.clone());
        });

        let ctx = ExecutionContext::new(dom, Globals::default()).with_me(child);
        Notifier::default().notify(&ctx, "add", "added", &[child], &Value::Boolean(true));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let Value::Object(detail) = &seen[0] else {
            panic!("detail should be an object");
        };
        assert_eq!(detail.get("command"), Some(&Value::string("add")));
        assert_eq!(detail.get("element"), Some(&Value::Element(child)));
        assert!(matches!(detail.get("timestamp"), Some(Value::Number(ms)) if *ms > 0.0));
        assert!(matches!(detail.get("context"), Some(Value::Object(_))));
    }

    #[test]
    fn disabled_notifier_dispatches_nothing() {
        let dom = Dom::default();
        let element = dom.write(|doc| {
            let element = doc.create_element("p");
            doc.append_child(doc.root(), element);
            element
        });
        let fired = Rc::new(RefCell::new(0));
        let fired_in_listener = Rc::clone(&fired);
        dom.add_event_listener(element, "app:hidden", move |_| {
            *fired_in_listener.borrow_mut() += 1;
        });
        let ctx = ExecutionContext::new(dom, Globals::default());
        let notifier = Notifier::new("app", false);
        notifier.notify(&ctx, "hide", "hidden", &[element], &Value::Undefined);
        assert_eq!(*fired.borrow(), 0);
        assert_eq!(Notifier::new("app", true).event_name("hidden"), "app:hidden");
    }
}
