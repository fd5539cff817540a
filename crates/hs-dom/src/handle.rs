use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{ElementId, Value};
use log::trace;

use crate::document::Document;
use crate::events::{DomEvent, ListenerId, ListenerTable};

/// Shared, single-threaded handle to a document and its event listeners.
///
/// Borrows are scoped to the closures passed to [`Dom::read`] and [`Dom::write`], so no borrow
/// survives across an `.await` or into a listener callback.
#[derive(Clone, Default)]
pub struct Dom {
    document: Rc<RefCell<Document>>,
    listeners: Rc<RefCell<ListenerTable>>,
}

impl Dom {
    pub fn new(document: Document) -> Self {
        Self {
            document: Rc::new(RefCell::new(document)),
            listeners: Rc::new(RefCell::new(ListenerTable::default())),
        }
    }

    pub fn read<R>(&self, reader: impl FnOnce(&Document) -> R) -> R {
        reader(&self.document.borrow())
    }

    pub fn write<R>(&self, writer: impl FnOnce(&mut Document) -> R) -> R {
        writer(&mut self.document.borrow_mut())
    }

    pub fn add_event_listener(
        &self,
        target: ElementId,
        event_name: &str,
        callback: impl Fn(&DomEvent) + 'static,
    ) -> ListenerId {
        self.listeners
            .borrow_mut()
            .add(target, event_name, Rc::new(callback))
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Delivers the event to listeners on `target`, then on each ancestor when `bubbles` is set.
    /// Returns how many callbacks ran.
    pub fn dispatch_event(
        &self,
        target: ElementId,
        event_name: &str,
        detail: Value,
        bubbles: bool,
    ) -> usize {
        let path = if bubbles {
            self.read(|doc| {
                let mut path = vec![target];
                let mut cursor = doc.parent_element(target);
                while let Some(parent) = cursor {
                    path.push(parent);
                    cursor = doc.parent_element(parent);
                }
                path
            })
        } else {
            vec![target]
        };

        let mut delivered = 0usize;
        for current_target in path {
            let callbacks = self.listeners.borrow().matching(current_target, event_name);
            if callbacks.is_empty() {
                continue;
            }
            let event = DomEvent {
                name: event_name.to_string(),
                target,
                current_target,
                detail: detail.clone(),
                bubbles,
            };
            for callback in callbacks {
                callback(&event);
                delivered += 1;
            }
        }
        trace!("dispatched {} on {} to {} listener(s)", event_name, target, delivered);
        delivered
    }
}

#[cfg(test)]
mod handle_tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispatch_bubbles_to_ancestors_and_listeners_can_mutate_document() {
        let dom = Dom::default();
        let (outer, inner) = dom.write(|doc| {
            let outer = doc.create_element("div");
            let inner = doc.create_element("button");
            doc.append_child(doc.root(), outer);
            doc.append_child(outer, inner);
            (outer, inner)
        });

        let seen = Rc::new(Cell::new(0));
        let seen_in_listener = Rc::clone(&seen);
        let dom_in_listener = dom.clone();
        dom.add_event_listener(outer, "click", move |event| {
            seen_in_listener.set(seen_in_listener.get() + 1);
            dom_in_listener.write(|doc| doc.add_class(event.current_target, "clicked"));
        });

        assert_eq!(dom.dispatch_event(inner, "click", Value::Null, true), 1);
        assert_eq!(dom.dispatch_event(inner, "click", Value::Null, false), 0);
        assert_eq!(seen.get(), 1);
        assert!(dom.read(|doc| doc.has_class(outer, "clicked")));
    }

    #[test]
    fn removed_listeners_stop_receiving() {
        let dom = Dom::default();
        let target = dom.write(|doc| {
            let target = doc.create_element("div");
            doc.append_child(doc.root(), target);
            target
        });
        let hits = Rc::new(Cell::new(0));
        let hits_in_listener = Rc::clone(&hits);
        let id = dom.add_event_listener(target, "ping", move |_| {
            hits_in_listener.set(hits_in_listener.get() + 1)
        });
        assert_eq!(dom.listener_count(), 1);
        dom.dispatch_event(target, "ping", Value::Null, false);
        assert!(dom.remove_event_listener(id));
        assert!(!dom.remove_event_listener(id));
        dom.dispatch_event(target, "ping", Value::Null, false);
        assert_eq!(hits.get(), 1);
        assert_eq!(dom.listener_count(), 0);
    }
}
