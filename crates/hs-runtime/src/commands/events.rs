use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::{FutureExt, LocalBoxFuture};
use hs_core::{CommandNode, CommandResult, Completion, ElementId, ErrorDescriptor, EventValue, Value};
use hs_dom::{Dom, ListenerId};
use log::debug;
use tokio::sync::oneshot;

use super::{ready, require_args, value_targets_or_default};
use crate::context::ExecutionContext;
use crate::protocol::{Command, CommandInput, ValidationReport};
use crate::resolver::require_targets;

/// Duration from a millisecond count or a `"2s"`/`"150ms"` string.
fn parse_duration(value: &Value) -> Option<Duration> {
    let millis = match value {
        Value::Number(number) => Some(*number),
        Value::String(text) => {
            let text = text.trim();
            if let Some(ms) = text.strip_suffix("ms") {
                ms.trim().parse::<f64>().ok()
            } else if let Some(seconds) = text.strip_suffix('s') {
                seconds.trim().parse::<f64>().ok().map(|seconds| seconds * 1000.0)
            } else {
                text.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    Duration::try_from_secs_f64(millis / 1000.0).ok()
}

fn bad_duration(value: &Value) -> ErrorDescriptor {
    ErrorDescriptor::invalid_argument(
        "CMD_BAD_DURATION",
        format!("'{}' is not a valid duration.", value.to_text()),
    )
    .suggest("Use a non-negative time such as 200ms or 2s.")
}

/// Removes every listener it holds when dropped, whichever way the wait ended.
struct ListenerGuard {
    dom: Dom,
    ids: Vec<ListenerId>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.dom.remove_event_listener(id);
        }
    }
}

/// `wait <duration>` or `wait for <event> [from <target>] [or <duration>]`.
pub struct WaitCommand;

impl Command for WaitCommand {
    fn name(&self) -> &'static str {
        "wait"
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        if node.modifiers.contains_key("for") {
            return ValidationReport::ok();
        }
        require_args(node, 1, "wait <duration> | wait for <event> [from <target>] [or <duration>]")
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        async move {
            let Some(event) = input.modifier("for") else {
                let requested = input.arg(0).cloned().unwrap_or_default();
                let duration = parse_duration(&requested).ok_or_else(|| bad_duration(&requested))?;
                tokio::time::sleep(duration).await;
                return Ok(Completion::undefined());
            };
            let timeout = match input.modifier("or") {
                Some(limit) => Some(parse_duration(limit).ok_or_else(|| bad_duration(limit))?),
                None => None,
            };
            let targets = match input.modifier("from") {
                Some(source) => require_targets(ctx, source, "wait")?,
                None => value_targets_or_default(ctx, None, "wait")?,
            };
            let received = wait_for_event(ctx.dom(), &targets, &event.to_text(), timeout).await;
            Ok(Completion::Normal(match received {
                Some(event) => Value::Event(Box::new(event)),
                None => Value::Undefined,
            }))
        }
        .boxed_local()
    }
}

/// Resolves with the first matching event, or `None` when the timeout wins the race.
async fn wait_for_event(
    dom: &Dom,
    targets: &[ElementId],
    name: &str,
    timeout: Option<Duration>,
) -> Option<EventValue> {
    let (sender, receiver) = oneshot::channel::<EventValue>();
    let sender = Rc::new(RefCell::new(Some(sender)));
    let mut guard = ListenerGuard {
        dom: dom.clone(),
        ids: Vec::new(),
    };
    for target in targets {
        let sender = Rc::clone(&sender);
        guard.ids.push(dom.add_event_listener(*target, name, move |event| {
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(EventValue {
                    name: event.name.clone(),
                    target: Some(event.target),
                    detail: event.detail.clone(),
                });
            }
        }));
    }
    debug!("waiting for {} on {} element(s)", name, targets.len());
    match timeout {
        Some(limit) => {
            tokio::select! {
                received = receiver => received.ok(),
                _ = tokio::time::sleep(limit) => {
                    debug!("wait for {} timed out", name);
                    None
                }
            }
        }
        None => receiver.await.ok(),
    }
}

/// `send`/`trigger <event>[(detail)] [to <target>]`: dispatches a bubbling event.
pub struct SendCommand {
    name: &'static str,
}

impl SendCommand {
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Command for SendCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(&self, node: &CommandNode) -> ValidationReport {
        require_args(node, 1, &format!("{} <event> [to <target>]", self.name))
    }

    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        input: CommandInput<'a>,
    ) -> LocalBoxFuture<'a, CommandResult> {
        ready(self.send(ctx, &input))
    }
}

impl SendCommand {
    fn send(&self, ctx: &mut ExecutionContext, input: &CommandInput<'_>) -> CommandResult {
        let event = input.arg(0).map(Value::to_text).unwrap_or_default();
        let targets = match input.modifier("to") {
            Some(target) => require_targets(ctx, target, self.name)?,
            None => value_targets_or_default(ctx, None, self.name)?,
        };
        let detail = input.modifier("detail").cloned().unwrap_or(Value::Null);
        for target in &targets {
            ctx.dom().dispatch_event(*target, &event, detail.clone(), true);
        }
        let result = Value::ElementList(targets.clone());
        input
            .evaluator
            .notifier()
            .notify(ctx, self.name, "sent", &targets, &result);
        Ok(Completion::Normal(result))
    }
}
