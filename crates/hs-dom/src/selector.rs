use hs_core::{ElementId, ErrorDescriptor};

use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOperator {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Substring,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    operator: AttrOperator,
    value: String,
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.operator {
            AttrOperator::Exists => true,
            AttrOperator::Equals => actual == self.value,
            AttrOperator::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOperator::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOperator::Substring => !self.value.is_empty() && actual.contains(&self.value),
            AttrOperator::Word => actual.split_whitespace().any(|word| word == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectorStep {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

impl SelectorStep {
    fn matches(&self, doc: &Document, id: ElementId) -> bool {
        let Some(tag_name) = doc.tag_name(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(tag_name) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if doc.get_attribute(id, "id") != Some(expected.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| doc.has_class(id, class)) {
            return false;
        }
        self.attrs
            .iter()
            .all(|condition| condition.matches(doc.get_attribute(id, &condition.name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    step: SelectorStep,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// One comma-separated alternative of a selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorGroup {
    parts: Vec<SelectorPart>,
}

impl SelectorGroup {
    pub fn matches(&self, doc: &Document, id: ElementId) -> bool {
        self.matches_from(doc, id, self.parts.len())
    }

    fn matches_from(&self, doc: &Document, id: ElementId, len: usize) -> bool {
        let Some(last) = len.checked_sub(1) else {
            return false;
        };
        let part = &self.parts[last];
        if !part.step.matches(doc, id) {
            return false;
        }
        let Some(combinator) = part.combinator else {
            return true;
        };
        match combinator {
            Combinator::Child => doc
                .parent_element(id)
                .is_some_and(|parent| self.matches_from(doc, parent, last)),
            Combinator::Descendant => {
                let mut cursor = doc.parent_element(id);
                while let Some(ancestor) = cursor {
                    if self.matches_from(doc, ancestor, last) {
                        return true;
                    }
                    cursor = doc.parent_element(ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => doc
                .previous_element_sibling(id)
                .is_some_and(|sibling| self.matches_from(doc, sibling, last)),
            Combinator::GeneralSibling => {
                let mut cursor = doc.previous_element_sibling(id);
                while let Some(sibling) = cursor {
                    if self.matches_from(doc, sibling, last) {
                        return true;
                    }
                    cursor = doc.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    /// `Some(id)` when the group is exactly `#id`.
    pub fn id_only(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [part]
                if part.step.tag.is_none()
                    && part.step.classes.is_empty()
                    && part.step.attrs.is_empty() =>
            {
                part.step.id.as_deref()
            }
            _ => None,
        }
    }
}

fn unsupported(selector: &str) -> ErrorDescriptor {
    ErrorDescriptor::syntax(
        "DOM_SELECTOR_UNSUPPORTED",
        format!("Unsupported or malformed selector \"{}\".", selector),
    )
    .suggest("Use tag, #id, .class, [attr] selectors with descendant, >, + or ~ combinators.")
}

pub fn parse_selector_groups(selector: &str) -> Result<Vec<SelectorGroup>, ErrorDescriptor> {
    let mut groups = Vec::new();
    for raw in split_outside_brackets(selector, ',').ok_or_else(|| unsupported(selector))? {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(unsupported(selector));
        }
        groups.push(parse_group(raw).ok_or_else(|| unsupported(selector))?);
    }
    Ok(groups)
}

fn split_outside_brackets(input: &str, separator: char) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in input.chars() {
        match (quote, ch) {
            (Some(open), _) if ch == open => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                depth = depth.checked_sub(1)?;
                current.push(ch);
            }
            (None, _) if ch == separator && depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    out.push(current);
    Some(out)
}

fn parse_group(raw: &str) -> Option<SelectorGroup> {
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut saw_space = false;
    let chars = raw.chars().collect::<Vec<_>>();
    let mut index = 0usize;

    while index < chars.len() {
        let ch = chars[index];
        if ch.is_whitespace() {
            saw_space = true;
            index += 1;
            continue;
        }
        if matches!(ch, '>' | '+' | '~') {
            if pending.is_some() || parts.is_empty() {
                return None;
            }
            pending = Some(match ch {
                '>' => Combinator::Child,
                '+' => Combinator::AdjacentSibling,
                _ => Combinator::GeneralSibling,
            });
            saw_space = false;
            index += 1;
            continue;
        }

        let start = index;
        let mut depth = 0usize;
        while index < chars.len() {
            let current = chars[index];
            if depth == 0 && (current.is_whitespace() || matches!(current, '>' | '+' | '~')) {
                break;
            }
            if current == '[' {
                depth += 1;
            } else if current == ']' {
                depth = depth.checked_sub(1)?;
            }
            index += 1;
        }
        let token = chars[start..index].iter().collect::<String>();
        let step = parse_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            match pending.take() {
                Some(combinator) => Some(combinator),
                None if saw_space => Some(Combinator::Descendant),
                None => return None,
            }
        };
        saw_space = false;
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return None;
    }
    Some(SelectorGroup { parts })
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn read_name(chars: &[char], index: &mut usize) -> Option<String> {
    let start = *index;
    while *index < chars.len() && is_name_char(chars[*index]) {
        *index += 1;
    }
    if *index == start {
        return None;
    }
    Some(chars[start..*index].iter().collect())
}

fn parse_step(token: &str) -> Option<SelectorStep> {
    let chars = token.chars().collect::<Vec<_>>();
    let mut step = SelectorStep::default();
    let mut index = 0usize;

    if chars.first() == Some(&'*') {
        index = 1;
    } else if chars.first().is_some_and(|ch| ch.is_ascii_alphabetic()) {
        step.tag = Some(read_name(&chars, &mut index)?.to_ascii_lowercase());
    }

    while index < chars.len() {
        match chars[index] {
            '#' => {
                index += 1;
                if step.id.is_some() {
                    return None;
                }
                step.id = Some(read_name(&chars, &mut index)?);
            }
            '.' => {
                index += 1;
                step.classes.push(read_name(&chars, &mut index)?);
            }
            '[' => {
                let close = chars[index..].iter().position(|ch| *ch == ']')? + index;
                let body = chars[index + 1..close].iter().collect::<String>();
                step.attrs.push(parse_attr_condition(&body)?);
                index = close + 1;
            }
            _ => return None,
        }
    }
    Some(step)
}

fn parse_attr_condition(body: &str) -> Option<AttrCondition> {
    let body = body.trim();
    let operators = [
        ("^=", AttrOperator::Prefix),
        ("$=", AttrOperator::Suffix),
        ("*=", AttrOperator::Substring),
        ("~=", AttrOperator::Word),
        ("=", AttrOperator::Equals),
    ];
    for (symbol, operator) in operators {
        if let Some((name, value)) = body.split_once(symbol) {
            let name = name.trim();
            if name.is_empty() || !name.chars().all(is_name_char) {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
                .unwrap_or(value);
            return Some(AttrCondition {
                name: name.to_string(),
                operator,
                value: value.to_string(),
            });
        }
    }
    if body.is_empty() || !body.chars().all(is_name_char) {
        return None;
    }
    Some(AttrCondition {
        name: body.to_string(),
        operator: AttrOperator::Exists,
        value: String::new(),
    })
}

#[cfg(test)]
mod selector_tests {
    use super::*;

    fn doc_with_list() -> (Document, Vec<ElementId>) {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        doc.set_attribute(list, "id", "menu");
        doc.append_child(doc.root(), list);
        let mut items = Vec::new();
        for (index, href) in ["/home", "/about", "https://x.dev"].iter().enumerate() {
            let item = doc.create_element("li");
            doc.set_attribute(item, "data-href", href);
            if index == 1 {
                doc.set_attribute(item, "class", "current item");
            } else {
                doc.set_attribute(item, "class", "item");
            }
            doc.append_child(list, item);
            items.push(item);
        }
        (doc, items)
    }

    #[test]
    fn attribute_operators_match() {
        let (doc, items) = doc_with_list();
        assert_eq!(
            doc.query_selector_all("[data-href^=\"/\"]").expect("query"),
            vec![items[0], items[1]]
        );
        assert_eq!(
            doc.query_selector_all("li[data-href$='.dev']").expect("query"),
            vec![items[2]]
        );
        assert_eq!(doc.query_selector_all("[class~=current]").expect("query"), vec![items[1]]);
    }

    #[test]
    fn combinators_follow_structure() {
        let (doc, items) = doc_with_list();
        assert_eq!(doc.query_selector_all("#menu > li.item").expect("query").len(), 3);
        assert_eq!(doc.query_selector_all(".current + li").expect("query"), vec![items[2]]);
        assert_eq!(doc.query_selector_all(".current ~ *").expect("query"), vec![items[2]]);
        assert_eq!(doc.query_selector_all("ul li, #menu").expect("query").len(), 4);
    }

    #[test]
    fn malformed_selectors_are_reported() {
        for selector in ["", "..x", "li >", "[unclosed", "a, ", "li:first-child", "> li"] {
            assert!(parse_selector_groups(selector).is_err(), "{} should fail", selector);
        }
    }

    #[test]
    fn id_only_detects_plain_id_groups() {
        let groups = parse_selector_groups("#menu").expect("parse");
        assert_eq!(groups[0].id_only(), Some("menu"));
        let groups = parse_selector_groups("ul#menu").expect("parse");
        assert_eq!(groups[0].id_only(), None);
    }
}
