use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use hs_core::{
    CommandNode, ElementId, ErrorDescriptor, EventValue, Feature, Node, ResultEnvelope, Value,
};
use hs_dom::{Dom, ListenerId};
use hs_runtime::{resolve_targets, Evaluator, ExecutionContext, FunctionDef, Globals, RuntimeOptions};
use log::{debug, info, warn};
use serde::Serialize;

/// Attributes whose value is installed as a behaviour by [`Runtime::scan`].
pub const SCRIPT_ATTRIBUTES: [&str; 3] = ["_", "script", "data-script"];

/// Outcome of one handler, `init` block or ad-hoc run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationReport {
    pub element: Option<ElementId>,
    pub event: String,
    pub outcome: ResultEnvelope,
    pub errors: Vec<ErrorDescriptor>,
    pub halted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub installed: Vec<ElementId>,
    pub errors: Vec<ErrorDescriptor>,
    pub invocations: Vec<InvocationReport>,
}

struct PendingInvocation {
    element: ElementId,
    event: EventValue,
    body: Rc<Vec<CommandNode>>,
}

type InvocationQueue = Rc<RefCell<VecDeque<PendingInvocation>>>;

struct RuntimeState {
    dom: Dom,
    evaluator: Evaluator,
    globals: Globals,
    queue: InvocationQueue,
    installed: RefCell<BTreeMap<ElementId, Vec<ListenerId>>>,
}

/// Installs behaviours on elements and routes DOM events to their handlers.
///
/// Cloning is cheap and every clone drives the same document, globals and function table.
/// Listeners only enqueue work; handlers run when [`Runtime::trigger`] drains the queue, so a
/// `send` issued by one handler runs its receivers after that handler finishes.
#[derive(Clone)]
pub struct Runtime {
    state: Rc<RuntimeState>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(dom: Dom, options: RuntimeOptions) -> Self {
        let globals = Rc::new(RefCell::new(options.initial_globals()));
        Self {
            state: Rc::new(RuntimeState {
                dom,
                evaluator: Evaluator::new(options),
                globals,
                queue: Rc::new(RefCell::new(VecDeque::new())),
                installed: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.state.dom
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.state.evaluator
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.state.globals.borrow().get(name).cloned()
    }

    /// First element matching `selector`.
    pub fn select(&self, selector: &str) -> Result<ElementId, ErrorDescriptor> {
        self.state
            .dom
            .read(|doc| doc.query_selector(selector))?
            .ok_or_else(|| {
                ErrorDescriptor::target_not_found(
                    "API_TARGET_NOT_FOUND",
                    format!("No element matches '{}'.", selector),
                )
            })
    }

    pub fn is_installed(&self, element: ElementId) -> bool {
        self.state.installed.borrow().contains_key(&element)
    }

    /// Parses `source` and attaches its features to `element`, replacing any earlier install.
    /// Returns the reports of its `init` blocks and of whatever they triggered.
    pub async fn install(
        &self,
        element: ElementId,
        source: &str,
    ) -> Result<Vec<InvocationReport>, ErrorDescriptor> {
        if !self.state.dom.read(|doc| doc.is_element(element)) {
            return Err(ErrorDescriptor::target_not_found(
                "API_ELEMENT_NOT_FOUND",
                format!("Element {} is not in the document.", element),
            ));
        }
        let program = hs_parser::parse_program(source)?;

        let mut handlers = Vec::new();
        let mut init_blocks = Vec::new();
        for feature in program.features {
            match feature {
                Feature::On { events, from, body } => {
                    let sources = match &from {
                        Some(node) => self.listen_sources(element, node)?,
                        None => vec![element],
                    };
                    handlers.push((events, sources, Rc::new(body)));
                }
                Feature::Def { name, params, body } => {
                    debug!("defined function {}({})", name, params.join(", "));
                    self.state
                        .evaluator
                        .define_function(FunctionDef { name, params, body });
                }
                Feature::Init { body } => init_blocks.push(body),
            }
        }

        self.uninstall(element);
        let mut listeners = Vec::new();
        for (events, sources, body) in handlers {
            for source in &sources {
                for name in &events {
                    let queue = Rc::clone(&self.state.queue);
                    let body = Rc::clone(&body);
                    let id = self.state.dom.add_event_listener(*source, name, move |event| {
                        queue.borrow_mut().push_back(PendingInvocation {
                            element,
                            event: EventValue {
                                name: event.name.clone(),
                                target: Some(event.target),
                                detail: event.detail.clone(),
                            },
                            body: Rc::clone(&body),
                        });
                    });
                    listeners.push(id);
                }
            }
        }
        info!(
            "installed behaviour on {}: {} listener(s), {} init block(s)",
            element,
            listeners.len(),
            init_blocks.len()
        );
        self.state.installed.borrow_mut().insert(element, listeners);

        let mut reports = Vec::new();
        for body in &init_blocks {
            reports.push(self.invoke(Some(element), "init", None, body).await);
        }
        reports.extend(self.drain().await);
        Ok(reports)
    }

    /// Removes the listeners installed on `element`. Returns whether anything was installed.
    pub fn uninstall(&self, element: ElementId) -> bool {
        let Some(listeners) = self.state.installed.borrow_mut().remove(&element) else {
            return false;
        };
        for id in listeners {
            self.state.dom.remove_event_listener(id);
        }
        true
    }

    /// Installs every element carrying one of [`SCRIPT_ATTRIBUTES`], in document order.
    /// A failing element is reported and the scan moves on.
    pub async fn scan(&self) -> ScanReport {
        let found: Vec<(ElementId, String)> = self.state.dom.read(|doc| {
            doc.all_elements()
                .into_iter()
                .filter_map(|id| {
                    SCRIPT_ATTRIBUTES
                        .iter()
                        .find_map(|name| doc.get_attribute(id, name))
                        .map(|source| (id, source.to_string()))
                })
                .collect()
        });

        let mut report = ScanReport::default();
        for (element, source) in found {
            match self.install(element, &source).await {
                Ok(invocations) => {
                    report.installed.push(element);
                    report.invocations.extend(invocations);
                }
                Err(error) => {
                    warn!("could not install behaviour on {}: {}", element, error);
                    report.errors.push(error);
                }
            }
        }
        report
    }

    /// Dispatches a bubbling event at `target` and runs every handler it queued, plus the
    /// handlers those handlers queued, in order.
    pub async fn trigger(
        &self,
        target: ElementId,
        event: &str,
        detail: Value,
    ) -> Vec<InvocationReport> {
        let delivered = self.state.dom.dispatch_event(target, event, detail, true);
        debug!("{} on {} reached {} listener(s)", event, target, delivered);
        self.drain().await
    }

    /// Runs a command sequence once, outside any handler, with `me` bound to `element`.
    pub async fn run(
        &self,
        element: Option<ElementId>,
        source: &str,
    ) -> Result<Vec<InvocationReport>, ErrorDescriptor> {
        let body = hs_parser::parse_commands(source)?;
        let mut reports = vec![self.invoke(element, "run", None, &body).await];
        reports.extend(self.drain().await);
        Ok(reports)
    }

    async fn drain(&self) -> Vec<InvocationReport> {
        let mut reports = Vec::new();
        loop {
            let next = self.state.queue.borrow_mut().pop_front();
            let Some(pending) = next else {
                break;
            };
            let name = pending.event.name.clone();
            reports.push(
                self.invoke(Some(pending.element), &name, Some(pending.event), &pending.body)
                    .await,
            );
        }
        reports
    }

    async fn invoke(
        &self,
        element: Option<ElementId>,
        label: &str,
        event: Option<EventValue>,
        body: &[CommandNode],
    ) -> InvocationReport {
        let mut ctx = self.root_context(element);
        if let Some(event) = event {
            ctx = ctx.with_event(event);
        }
        debug!(
            "running {} handler on {}",
            label,
            element.map(|id| id.to_string()).unwrap_or_else(|| "document".to_string())
        );
        let outcome = self.state.evaluator.run_to_boundary(body, &mut ctx).await;
        if let Err(error) = &outcome.result {
            warn!("{} handler failed: {}", label, error);
        }
        InvocationReport {
            element,
            event: label.to_string(),
            outcome: ResultEnvelope::from(&outcome.result),
            errors: ctx.errors(),
            halted: outcome.halted,
        }
    }

    fn root_context(&self, element: Option<ElementId>) -> ExecutionContext {
        let ctx = ExecutionContext::new(self.state.dom.clone(), Rc::clone(&self.state.globals));
        match element {
            Some(element) => ctx.with_me(element),
            None => ctx,
        }
    }

    fn listen_sources(
        &self,
        element: ElementId,
        from: &Node,
    ) -> Result<Vec<ElementId>, ErrorDescriptor> {
        let ctx = self.root_context(Some(element));
        let value = self.state.evaluator.evaluate(from, &ctx)?;
        let sources = resolve_targets(&ctx, &value);
        if sources.is_empty() {
            warn!("'from' source of {} matched no elements", element);
        }
        Ok(sources)
    }
}
