use std::rc::Rc;

use hs_core::{ElementId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub name: String,
    pub target: ElementId,
    pub current_target: ElementId,
    pub detail: Value,
    pub bubbles: bool,
}

pub(crate) type ListenerCallback = Rc<dyn Fn(&DomEvent)>;

struct Listener {
    id: ListenerId,
    target: ElementId,
    event_name: String,
    callback: ListenerCallback,
}

#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl ListenerTable {
    pub(crate) fn add(
        &mut self,
        target: ElementId,
        event_name: &str,
        callback: ListenerCallback,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener {
            id,
            target,
            event_name: event_name.to_string(),
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        before != self.listeners.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Callbacks registered on `target` for `event_name`, in registration order.
    pub(crate) fn matching(&self, target: ElementId, event_name: &str) -> Vec<ListenerCallback> {
        self.listeners
            .iter()
            .filter(|listener| listener.target == target && listener.event_name == event_name)
            .map(|listener| Rc::clone(&listener.callback))
            .collect()
    }
}
