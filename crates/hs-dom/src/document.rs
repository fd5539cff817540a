use std::collections::{BTreeMap, HashMap};

use hs_core::{ElementId, ErrorDescriptor};

use crate::selector::{parse_selector_groups, SelectorGroup};

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag_name: String,
    attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    kind: NodeKind,
}

/// Arena-backed document tree. Detached nodes stay in the arena until the document is dropped.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: ElementId,
    id_index: HashMap<String, Vec<ElementId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: ElementId(0),
            id_index: HashMap::new(),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn push_node(&mut self, kind: NodeKind) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub fn create_element(&mut self, tag_name: &str) -> ElementId {
        self.push_node(NodeKind::Element(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> ElementId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    pub fn is_element(&self, id: ElementId) -> bool {
        matches!(self.node(id).map(|node| &node.kind), Some(NodeKind::Element(_)))
    }

    pub fn is_text(&self, id: ElementId) -> bool {
        matches!(self.node(id).map(|node| &node.kind), Some(NodeKind::Text(_)))
    }

    fn element(&self, id: ElementId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.parent
    }

    pub fn parent_element(&self, id: ElementId) -> Option<ElementId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn child_nodes(&self, id: ElementId) -> &[ElementId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.child_nodes(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn previous_element_sibling(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent(id)?;
        let siblings = self.child_nodes(parent);
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    pub fn is_connected(&self, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    // Attributes

    pub fn attributes(&self, id: ElementId) -> Vec<(String, String)> {
        self.element(id)
            .map(|element| element.attrs.clone())
            .unwrap_or_default()
    }

    pub fn get_attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, id: ElementId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> bool {
        if name == "id" {
            if let Some(previous) = self.get_attribute(id, "id").map(str::to_string) {
                self.unindex_id(&previous, id);
            }
            self.index_id(value, id);
        }
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        match element.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
        true
    }

    pub fn remove_attribute(&mut self, id: ElementId, name: &str) -> bool {
        if name == "id" {
            if let Some(previous) = self.get_attribute(id, "id").map(str::to_string) {
                self.unindex_id(&previous, id);
            }
        }
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        let before = element.attrs.len();
        element.attrs.retain(|(key, _)| key != name);
        before != element.attrs.len()
    }

    fn index_id(&mut self, id_value: &str, id: ElementId) {
        if id_value.is_empty() {
            return;
        }
        let entries = self.id_index.entry(id_value.to_string()).or_default();
        if !entries.contains(&id) {
            entries.push(id);
        }
    }

    fn unindex_id(&mut self, id_value: &str, id: ElementId) {
        if let Some(entries) = self.id_index.get_mut(id_value) {
            entries.retain(|entry| *entry != id);
            if entries.is_empty() {
                self.id_index.remove(id_value);
            }
        }
    }

    /// Connected elements carrying the id, straight from the id index.
    pub fn elements_by_id(&self, id_value: &str) -> Vec<ElementId> {
        self.id_index
            .get(id_value)
            .map(|entries| {
                entries
                    .iter()
                    .copied()
                    .filter(|entry| self.is_connected(*entry))
                    .collect()
            })
            .unwrap_or_default()
    }

    // Classes

    pub fn class_list(&self, id: ElementId) -> Vec<String> {
        self.get_attribute(id, "class")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: ElementId, class_name: &str) -> bool {
        self.class_list(id).iter().any(|entry| entry == class_name)
    }

    pub fn add_class(&mut self, id: ElementId, class_name: &str) -> bool {
        let mut classes = self.class_list(id);
        if classes.iter().any(|entry| entry == class_name) {
            return false;
        }
        classes.push(class_name.to_string());
        self.set_attribute(id, "class", &classes.join(" "))
    }

    pub fn remove_class(&mut self, id: ElementId, class_name: &str) -> bool {
        let mut classes = self.class_list(id);
        let before = classes.len();
        classes.retain(|entry| entry != class_name);
        if classes.len() == before {
            return false;
        }
        self.set_attribute(id, "class", &classes.join(" "))
    }

    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, id: ElementId, class_name: &str) -> bool {
        if self.has_class(id, class_name) {
            self.remove_class(id, class_name);
            false
        } else {
            self.add_class(id, class_name);
            true
        }
    }

    // Inline style, kept serialized in the `style` attribute.

    pub fn style_map(&self, id: ElementId) -> BTreeMap<String, String> {
        self.get_attribute(id, "style")
            .map(parse_style)
            .unwrap_or_default()
    }

    pub fn style_property(&self, id: ElementId, property: &str) -> Option<String> {
        self.style_map(id).remove(&normalize_style_name(property))
    }

    pub fn set_style_property(&mut self, id: ElementId, property: &str, value: &str) -> bool {
        let mut styles = self.style_map(id);
        let property = normalize_style_name(property);
        if value.is_empty() {
            styles.remove(&property);
        } else {
            styles.insert(property, value.to_string());
        }
        if styles.is_empty() {
            self.remove_attribute(id, "style");
            self.is_element(id)
        } else {
            self.set_attribute(id, "style", &render_style(&styles))
        }
    }

    pub fn dataset(&self, id: ElementId) -> BTreeMap<String, String> {
        self.attributes(id)
            .into_iter()
            .filter_map(|(name, value)| {
                name.strip_prefix("data-")
                    .map(|key| (dash_to_camel(key), value))
            })
            .collect()
    }

    // Text

    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if let NodeKind::Text(text) = &node.kind {
            out.push_str(text);
            return;
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    pub fn set_text_content(&mut self, id: ElementId, text: &str) -> bool {
        if !self.is_element(id) {
            return false;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
        true
    }

    pub fn clear_children(&mut self, id: ElementId) {
        let children = self.child_nodes(id).to_vec();
        for child in children {
            self.detach(child);
        }
    }

    // Tree mutation

    fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn can_insert(&self, parent: ElementId, child: ElementId) -> bool {
        let parent_ok = matches!(
            self.node(parent).map(|node| &node.kind),
            Some(NodeKind::Document | NodeKind::Element(_))
        );
        parent_ok
            && self.node(child).is_some()
            && child != self.root
            && !self.is_ancestor_or_self(child, parent)
    }

    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        self.insert_child_at(parent, child, usize::MAX)
    }

    pub fn prepend_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        self.insert_child_at(parent, child, 0)
    }

    fn insert_child_at(&mut self, parent: ElementId, child: ElementId, index: usize) -> bool {
        if !self.can_insert(parent, child) {
            return false;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    pub fn insert_before(&mut self, reference: ElementId, node: ElementId) -> bool {
        self.insert_adjacent(reference, node, 0)
    }

    pub fn insert_after(&mut self, reference: ElementId, node: ElementId) -> bool {
        self.insert_adjacent(reference, node, 1)
    }

    fn insert_adjacent(&mut self, reference: ElementId, node: ElementId, offset: usize) -> bool {
        if reference == node {
            return false;
        }
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if !self.can_insert(parent, node) {
            return false;
        }
        self.detach(node);
        let siblings = self.child_nodes(parent);
        let Some(position) = siblings.iter().position(|sibling| *sibling == reference) else {
            return false;
        };
        self.insert_child_at(parent, node, position + offset)
    }

    pub fn remove(&mut self, id: ElementId) -> bool {
        if id == self.root || self.parent(id).is_none() {
            return false;
        }
        self.detach(id);
        true
    }

    // Traversal and queries

    /// Connected elements in document order.
    pub fn all_elements(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, id: ElementId, out: &mut Vec<ElementId>) {
        if self.is_element(id) {
            out.push(id);
        }
        for child in self.child_nodes(id) {
            self.collect_elements(*child, out);
        }
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementId>, ErrorDescriptor> {
        let groups = parse_selector_groups(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|candidate| self.matches_any(*candidate, &groups))
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<ElementId>, ErrorDescriptor> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn matches(&self, id: ElementId, selector: &str) -> Result<bool, ErrorDescriptor> {
        let groups = parse_selector_groups(selector)?;
        Ok(self.is_element(id) && self.matches_any(id, &groups))
    }

    pub fn closest(&self, id: ElementId, selector: &str) -> Result<Option<ElementId>, ErrorDescriptor> {
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.is_element(current) && self.matches_any(current, &groups) {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    fn matches_any(&self, id: ElementId, groups: &[SelectorGroup]) -> bool {
        groups.iter().any(|group| group.matches(self, id))
    }

    pub(crate) fn node_text(&self, id: ElementId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

fn parse_style(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

fn render_style(styles: &BTreeMap<String, String>) -> String {
    styles
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `backgroundColor` and `background-color` address the same property.
fn normalize_style_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn dash_to_camel(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for ch in name.chars() {
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

#[cfg(test)]
mod document_tests {
    use super::*;

    fn sample() -> (Document, ElementId, ElementId, ElementId) {
        let mut doc = Document::new();
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body);
        let first = doc.create_element("div");
        doc.set_attribute(first, "id", "first");
        doc.append_child(body, first);
        let second = doc.create_element("p");
        doc.set_attribute(second, "class", "note big");
        doc.append_child(body, second);
        (doc, body, first, second)
    }

    #[test]
    fn class_operations_keep_attribute_in_sync() {
        let (mut doc, _, first, second) = sample();
        assert!(doc.add_class(first, "active"));
        assert!(!doc.add_class(first, "active"));
        assert_eq!(doc.get_attribute(first, "class"), Some("active"));
        assert!(doc.remove_class(second, "note"));
        assert_eq!(doc.class_list(second), vec!["big".to_string()]);
        assert!(!doc.toggle_class(second, "big"));
        assert!(doc.toggle_class(second, "big"));
    }

    #[test]
    fn style_properties_accept_camel_case_names() {
        let (mut doc, _, first, _) = sample();
        doc.set_style_property(first, "backgroundColor", "red");
        doc.set_style_property(first, "display", "none");
        assert_eq!(
            doc.get_attribute(first, "style"),
            Some("background-color: red; display: none;")
        );
        assert_eq!(doc.style_property(first, "background-color").as_deref(), Some("red"));
        doc.set_style_property(first, "display", "");
        doc.set_style_property(first, "background-color", "");
        assert!(!doc.has_attribute(first, "style"));
    }

    #[test]
    fn id_index_follows_attribute_changes_and_detachment() {
        let (mut doc, _, first, second) = sample();
        assert_eq!(doc.elements_by_id("first"), vec![first]);
        doc.set_attribute(first, "id", "renamed");
        assert!(doc.elements_by_id("first").is_empty());
        doc.set_attribute(second, "id", "renamed");
        assert_eq!(doc.elements_by_id("renamed").len(), 2);
        doc.remove(first);
        assert_eq!(doc.elements_by_id("renamed"), vec![second]);
    }

    #[test]
    fn insertion_helpers_preserve_order_and_reject_cycles() {
        let (mut doc, body, first, second) = sample();
        let span = doc.create_element("span");
        assert!(doc.insert_before(second, span));
        assert_eq!(doc.children(body), vec![first, span, second]);
        assert!(doc.insert_after(second, span));
        assert_eq!(doc.children(body), vec![first, second, span]);
        assert!(!doc.append_child(first, body));
        assert!(doc.prepend_child(body, span));
        assert_eq!(doc.children(body), vec![span, first, second]);
    }

    #[test]
    fn text_content_replaces_children() {
        let (mut doc, body, first, _) = sample();
        doc.set_text_content(first, "hello");
        assert_eq!(doc.text_content(first), "hello");
        assert_eq!(doc.text_content(body), "hello");
        doc.set_text_content(first, "");
        assert!(doc.child_nodes(first).is_empty());
    }

    #[test]
    fn dataset_uses_camel_case_keys() {
        let (mut doc, _, first, _) = sample();
        doc.set_attribute(first, "data-user-id", "7");
        assert_eq!(doc.dataset(first).get("userId").map(String::as_str), Some("7"));
    }

    #[test]
    fn queries_return_document_order() {
        let (doc, body, first, second) = sample();
        assert_eq!(doc.query_selector_all("body > *").expect("query"), vec![first, second]);
        assert_eq!(doc.query_selector("p.note").expect("query"), Some(second));
        assert_eq!(doc.closest(second, "body").expect("closest"), Some(body));
        assert!(doc.matches(first, "#first").expect("matches"));
        assert!(doc.query_selector_all("div:hover").is_err());
    }
}
