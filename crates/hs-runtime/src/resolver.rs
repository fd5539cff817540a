use std::sync::OnceLock;

use hs_core::{ElementId, ErrorDescriptor, Value};
use hs_dom::Document;
use log::trace;
use regex::Regex;

use crate::context::ExecutionContext;

fn bare_tag_regex() -> &'static Regex {
    static BARE_TAG: OnceLock<Regex> = OnceLock::new();
    BARE_TAG.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(?:[\s>+~.#\[,].*)?$").expect("tag regex must compile")
    })
}

fn id_only_regex() -> &'static Regex {
    static ID_ONLY: OnceLock<Regex> = OnceLock::new();
    ID_ONLY.get_or_init(|| Regex::new(r"^#([A-Za-z_][\w-]*)$").expect("id regex must compile"))
}

/// Turns `<button.primary/>` into `button.primary`; other text is trimmed and returned as is.
pub fn normalize_selector(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix("/>"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Whether `raw` reads as a CSS selector rather than arbitrary text.
pub fn looks_like_selector(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') {
        return trimmed.ends_with("/>");
    }
    matches!(trimmed.chars().next(), Some('#' | '.' | '[' | '*')) || bare_tag_regex().is_match(trimmed)
}

/// Resolves a target specifier to elements in order. Never fails: anything that cannot be
/// resolved, including a malformed selector, yields an empty list.
pub fn resolve_targets(ctx: &ExecutionContext, specifier: &Value) -> Vec<ElementId> {
    let resolved = match specifier {
        Value::Element(id) => {
            if ctx.dom().read(|doc| doc.is_element(*id)) {
                vec![*id]
            } else {
                Vec::new()
            }
        }
        Value::ElementList(ids) => ctx
            .dom()
            .read(|doc| ids.iter().copied().filter(|id| doc.is_element(*id)).collect()),
        Value::Array(items) => ctx.dom().read(|doc| {
            items
                .iter()
                .filter_map(Value::as_element)
                .filter(|id| doc.is_element(*id))
                .collect()
        }),
        Value::String(raw) => resolve_string(ctx, raw),
        Value::Null | Value::Undefined => Vec::new(),
        _ => Vec::new(),
    };
    trace!(
        "resolved {} specifier to {} element(s)",
        specifier.type_name(),
        resolved.len()
    );
    resolved
}

fn resolve_string(ctx: &ExecutionContext, raw: &str) -> Vec<ElementId> {
    match raw.trim() {
        "me" => return ctx.me.into_iter().collect(),
        "you" => return ctx.you.into_iter().collect(),
        "it" => {
            return match &ctx.it {
                Value::String(_) => Vec::new(),
                other => resolve_targets(ctx, other),
            }
        }
        _ => {}
    }
    if !looks_like_selector(raw) {
        return Vec::new();
    }
    let selector = normalize_selector(raw);
    ctx.dom()
        .read(|doc| query_with_id_fast_path(doc, selector))
        .unwrap_or_else(|error| {
            trace!("selector {:?} rejected: {}", selector, error);
            Vec::new()
        })
}

/// `#id` goes through the id index; an id shared by several elements falls back to the
/// general query so both paths agree.
pub fn query_with_id_fast_path(
    doc: &Document,
    selector: &str,
) -> Result<Vec<ElementId>, ErrorDescriptor> {
    if let Some(captures) = id_only_regex().captures(selector) {
        let found = doc.elements_by_id(&captures[1]);
        if found.len() <= 1 {
            return Ok(found);
        }
    }
    doc.query_selector_all(selector)
}

/// Like [`resolve_targets`] for commands that need at least one element.
pub fn require_targets(
    ctx: &ExecutionContext,
    specifier: &Value,
    command: &str,
) -> Result<Vec<ElementId>, ErrorDescriptor> {
    let targets = resolve_targets(ctx, specifier);
    if targets.is_empty() {
        return Err(ErrorDescriptor::target_not_found(
            "CMD_TARGET_NOT_FOUND",
            format!("'{}' found no element for {}.", command, specifier.to_text()),
        )
        .suggest("Check the selector, or that the element exists when the command runs."));
    }
    Ok(targets)
}
