use std::collections::BTreeMap;

use hs_core::{ElementId, ErrorDescriptor, Value};
use hs_dom::Document;

use crate::context::ExecutionContext;

/// Property read. Never fails: unknown names and null/undefined bases give `undefined`.
/// Names starting with `@` read attributes.
pub fn get_property(ctx: &ExecutionContext, base: &Value, name: &str) -> Value {
    match base {
        Value::Null | Value::Undefined => Value::Undefined,
        Value::Element(id) => ctx.dom().read(|doc| element_property(doc, *id, name)),
        Value::ElementList(ids) => match name {
            "length" => Value::Number(ids.len() as f64),
            "first" => ids.first().copied().map(Value::Element).unwrap_or_default(),
            "last" => ids.last().copied().map(Value::Element).unwrap_or_default(),
            _ => ctx.dom().read(|doc| {
                Value::Array(
                    ids.iter()
                        .map(|id| element_property(doc, *id, name))
                        .collect(),
                )
            }),
        },
        Value::Array(items) => match name {
            "length" => Value::Number(items.len() as f64),
            "first" => items.first().cloned().unwrap_or_default(),
            "last" => items.last().cloned().unwrap_or_default(),
            _ => Value::Array(
                items
                    .iter()
                    .map(|item| get_property(ctx, item, name))
                    .collect(),
            ),
        },
        Value::String(text) => match name {
            "length" => Value::Number(text.chars().count() as f64),
            "first" => text
                .chars()
                .next()
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or_default(),
            "last" => text
                .chars()
                .last()
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or_default(),
            _ => Value::Undefined,
        },
        Value::Object(entries) => entries.get(name).cloned().unwrap_or_default(),
        Value::Event(event) => match name {
            "type" | "name" => Value::string(event.name.clone()),
            "target" => event.target.map(Value::Element).unwrap_or(Value::Null),
            "detail" => event.detail.clone(),
            _ => get_property(ctx, &event.detail, name),
        },
        Value::Number(_) | Value::Boolean(_) | Value::Function(_) => Value::Undefined,
    }
}

fn element_property(doc: &Document, id: ElementId, name: &str) -> Value {
    if let Some(attribute) = name.strip_prefix('@') {
        return doc
            .get_attribute(id, attribute)
            .map(Value::string)
            .unwrap_or(Value::Null);
    }
    let attribute_or_empty =
        |attribute: &str| Value::string(doc.get_attribute(id, attribute).unwrap_or_default());
    match name {
        "id" => attribute_or_empty("id"),
        "className" => attribute_or_empty("class"),
        "value" => attribute_or_empty("value"),
        "tagName" => doc
            .tag_name(id)
            .map(|tag| Value::String(tag.to_ascii_uppercase()))
            .unwrap_or_default(),
        "textContent" | "innerText" => Value::String(doc.text_content(id)),
        "innerHTML" => Value::String(doc.inner_html(id)),
        "outerHTML" => Value::String(doc.outer_html(id)),
        "classList" => Value::Array(doc.class_list(id).into_iter().map(Value::String).collect()),
        "style" => Value::Object(
            doc.style_map(id)
                .into_iter()
                .map(|(property, value)| (camel_case(&property), Value::String(value)))
                .collect(),
        ),
        "dataset" => Value::Object(
            doc.dataset(id)
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        ),
        "parentElement" | "parent" => doc
            .parent_element(id)
            .map(Value::Element)
            .unwrap_or(Value::Null),
        "children" => Value::ElementList(doc.children(id)),
        "firstElementChild" => doc
            .children(id)
            .first()
            .copied()
            .map(Value::Element)
            .unwrap_or(Value::Null),
        "lastElementChild" => doc
            .children(id)
            .last()
            .copied()
            .map(Value::Element)
            .unwrap_or(Value::Null),
        "hidden" => Value::Boolean(
            doc.has_attribute(id, "hidden")
                || doc.style_property(id, "display").as_deref() == Some("none"),
        ),
        "checked" | "disabled" => Value::Boolean(doc.has_attribute(id, name)),
        _ => doc
            .get_attribute(id, name)
            .map(Value::string)
            .unwrap_or_default(),
    }
}

/// Element property write used by `set` and `put ... into my x`.
pub fn set_element_property(
    doc: &mut Document,
    id: ElementId,
    name: &str,
    value: &Value,
) -> Result<(), ErrorDescriptor> {
    if let Some(attribute) = name.strip_prefix('@') {
        if value.is_nullish() {
            doc.remove_attribute(id, attribute);
        } else {
            doc.set_attribute(id, attribute, &value.to_text());
        }
        return Ok(());
    }
    match name {
        "id" | "value" => {
            doc.set_attribute(id, name, &value.to_text());
        }
        "className" => {
            doc.set_attribute(id, "class", &value.to_text());
        }
        "textContent" | "innerText" => {
            doc.set_text_content(id, &value.to_text());
        }
        "innerHTML" => replace_inner_html(doc, id, &value.to_text()),
        "hidden" | "checked" | "disabled" => {
            if value.is_truthy() {
                doc.set_attribute(id, name, "");
            } else {
                doc.remove_attribute(id, name);
            }
        }
        _ => {
            return Err(ErrorDescriptor::invalid_argument(
                "EVAL_UNKNOWN_PROPERTY",
                format!("Element property '{}' cannot be set.", name),
            )
            .suggest(format!("Use @{} to set an attribute.", name))
            .suggest("Use 'my style.<name>' for inline styles."))
        }
    }
    Ok(())
}

/// Markup text becomes child nodes; text that does not parse is inserted as plain text.
pub(crate) fn replace_inner_html(doc: &mut Document, id: ElementId, markup: &str) {
    if !markup.contains('<') {
        doc.set_text_content(id, markup);
        return;
    }
    match doc.parse_fragment(markup) {
        Ok(nodes) => {
            doc.clear_children(id);
            for node in nodes {
                doc.append_child(id, node);
            }
        }
        Err(_) => {
            doc.set_text_content(id, markup);
        }
    }
}

pub fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::Array(items), _) => position(index, items.len())
            .and_then(|at| items.get(at).cloned())
            .unwrap_or_default(),
        (Value::ElementList(ids), _) => position(index, ids.len())
            .and_then(|at| ids.get(at).copied().map(Value::Element))
            .unwrap_or_default(),
        (Value::String(text), _) => position(index, text.chars().count())
            .and_then(|at| text.chars().nth(at))
            .map(|ch| Value::String(ch.to_string()))
            .unwrap_or_default(),
        (Value::Object(entries), key) => entries.get(&key.to_text()).cloned().unwrap_or_default(),
        _ => Value::Undefined,
    }
}

fn position(index: &Value, len: usize) -> Option<usize> {
    let number = index.to_number()?;
    if number < 0.0 || number.fract() != 0.0 || number as usize >= len {
        return None;
    }
    Some(number as usize)
}

fn camel_case(kebab: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for ch in kebab.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Style and dataset keys written through `my style.x` / `my dataset.x`.
pub(crate) fn kebab_case(camel: &str) -> String {
    let mut out = String::new();
    for ch in camel.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub(crate) fn object_with(base: &Value, key: &str, value: Value) -> Option<Value> {
    match base {
        Value::Object(entries) => {
            let mut entries: BTreeMap<String, Value> = entries.clone();
            entries.insert(key.to_string(), value);
            Some(Value::Object(entries))
        }
        Value::Null | Value::Undefined => {
            let mut entries = BTreeMap::new();
            entries.insert(key.to_string(), value);
            Some(Value::Object(entries))
        }
        _ => None,
    }
}

#[cfg(test)]
mod properties_tests {
    use hs_dom::{parse_document, Dom};

    use super::*;
    use crate::context::Globals;

    fn fixture() -> (ExecutionContext, ElementId) {
        let doc = parse_document(
            r#"<div id="card" class="a b" data-user-id="7" style="background-color: red"><span>hi</span></div>"#,
        )
        .expect("fixture");
        let dom = Dom::new(doc);
        let card = dom.read(|doc| doc.elements_by_id("card")[0]);
        (ExecutionContext::new(dom, Globals::default()).with_me(card), card)
    }

    #[test]
    fn element_properties_expose_dom_views() {
        let (ctx, card) = fixture();
        let card_value = Value::Element(card);
        assert_eq!(get_property(&ctx, &card_value, "tagName"), Value::string("DIV"));
        assert_eq!(get_property(&ctx, &card_value, "textContent"), Value::string("hi"));
        assert_eq!(get_property(&ctx, &card_value, "@data-user-id"), Value::string("7"));
        assert_eq!(get_property(&ctx, &card_value, "@missing"), Value::Null);
        let style = get_property(&ctx, &card_value, "style");
        assert_eq!(get_property(&ctx, &style, "backgroundColor"), Value::string("red"));
        let dataset = get_property(&ctx, &card_value, "dataset");
        assert_eq!(get_property(&ctx, &dataset, "userId"), Value::string("7"));
        assert!(matches!(get_property(&ctx, &card_value, "children"), Value::ElementList(ids) if ids.len() == 1));
    }

    #[test]
    fn null_bases_short_circuit_to_undefined() {
        let (ctx, _) = fixture();
        let missing = get_property(&ctx, &Value::Null, "style");
        assert_eq!(missing, Value::Undefined);
        assert_eq!(get_property(&ctx, &missing, "color"), Value::Undefined);
        assert_eq!(get_property(&ctx, &Value::Number(1.0), "x"), Value::Undefined);
    }

    #[test]
    fn collections_map_property_access() {
        let (ctx, card) = fixture();
        let list = Value::ElementList(vec![card, card]);
        assert_eq!(get_property(&ctx, &list, "length"), Value::Number(2.0));
        assert_eq!(
            get_property(&ctx, &list, "id"),
            Value::Array(vec![Value::string("card"), Value::string("card")])
        );
        assert_eq!(index_value(&list, &Value::Number(1.0)), Value::Element(card));
        assert_eq!(index_value(&list, &Value::Number(5.0)), Value::Undefined);
        assert_eq!(index_value(&Value::string("abc"), &Value::Number(-1.0)), Value::Undefined);
    }

    #[test]
    fn setters_write_attributes_text_and_markup() {
        let (ctx, card) = fixture();
        ctx.dom()
            .write(|doc| {
                set_element_property(doc, card, "@title", &Value::string("T"))?;
                set_element_property(doc, card, "innerHTML", &Value::string("<b>bold</b>"))?;
                set_element_property(doc, card, "hidden", &Value::Boolean(true))
            })
            .expect("setters should pass");
        ctx.dom().read(|doc| {
            assert_eq!(doc.get_attribute(card, "title"), Some("T"));
            assert_eq!(doc.inner_html(card), "<b>bold</b>");
            assert!(doc.has_attribute(card, "hidden"));
        });
        let error = ctx
            .dom()
            .write(|doc| set_element_property(doc, card, "bogus", &Value::Null))
            .expect_err("unknown property");
        assert_eq!(error.code, "EVAL_UNKNOWN_PROPERTY");
    }

    #[test]
    fn case_conversions_round_trip_style_names() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(camel_case("background-color"), "backgroundColor");
    }
}
