use hs_core::{ElementId, ErrorDescriptor};

use crate::document::Document;

/// Builds a document from well-formed XHTML. Whitespace-only text between elements is dropped.
pub fn parse_document(markup: &str) -> Result<Document, ErrorDescriptor> {
    let parsed = roxmltree::Document::parse(markup).map_err(|error| {
        ErrorDescriptor::syntax("DOM_MARKUP_PARSE", format!("Cannot parse markup: {}", error))
            .suggest("Fixtures must be well-formed XHTML: close every tag and quote attributes.")
    })?;
    let mut doc = Document::new();
    let root = doc.root();
    import_node(&mut doc, root, parsed.root_element());
    Ok(doc)
}

fn import_node(doc: &mut Document, parent: ElementId, source: roxmltree::Node<'_, '_>) {
    if source.is_text() {
        if let Some(text) = source.text() {
            if !text.trim().is_empty() {
                let node = doc.create_text(text);
                doc.append_child(parent, node);
            }
        }
        return;
    }
    if !source.is_element() {
        return;
    }
    let element = doc.create_element(source.tag_name().name());
    for attribute in source.attributes() {
        doc.set_attribute(element, attribute.name(), attribute.value());
    }
    doc.append_child(parent, element);
    for child in source.children() {
        import_node(doc, element, child);
    }
}

impl Document {
    /// Parses `markup` as a sequence of sibling nodes, returning the detached top-level nodes.
    pub fn parse_fragment(&mut self, markup: &str) -> Result<Vec<ElementId>, ErrorDescriptor> {
        let wrapped = format!("<fragment>{}</fragment>", markup);
        let parsed = roxmltree::Document::parse(&wrapped).map_err(|error| {
            ErrorDescriptor::syntax(
                "DOM_FRAGMENT_PARSE",
                format!("Cannot parse markup fragment: {}", error),
            )
        })?;
        let holder = self.create_element("fragment");
        for child in parsed.root_element().children() {
            import_node(self, holder, child);
        }
        let nodes = self.child_nodes(holder).to_vec();
        self.clear_children(holder);
        Ok(nodes)
    }

    pub fn outer_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        for child in self.child_nodes(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    pub fn to_markup(&self) -> String {
        self.inner_html(self.root())
    }

    fn write_node(&self, id: ElementId, out: &mut String) {
        if let Some(text) = self.node_text(id) {
            out.push_str(&escape_text(text));
            return;
        }
        let Some(tag) = self.tag_name(id) else {
            return;
        };
        out.push('<');
        out.push_str(tag);
        for (name, value) in self.attributes(id) {
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            out.push_str(&escape_text(&value).replace('"', "&quot;"));
            out.push('"');
        }
        let children = self.child_nodes(id);
        if children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in children {
            self.write_node(*child, out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

pub fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod markup_tests {
    use super::*;

    #[test]
    fn parse_and_serialize_keep_structure() {
        let doc = parse_document(
            r#"<body>
  <button id="go" class="btn primary">Go &amp; run</button>
  <div data-count="2"/>
</body>"#,
        )
        .expect("markup should parse");
        assert_eq!(
            doc.to_markup(),
            r#"<body><button id="go" class="btn primary">Go &amp; run</button><div data-count="2"/></body>"#
        );
        let button = doc.elements_by_id("go")[0];
        assert_eq!(doc.text_content(button), "Go & run");
    }

    #[test]
    fn malformed_markup_is_a_syntax_error() {
        let error = parse_document("<body><p></body>").expect_err("should fail");
        assert_eq!(error.kind, hs_core::ErrorKind::SyntaxError);
        assert_eq!(error.code, "DOM_MARKUP_PARSE");
    }

    #[test]
    fn fragments_are_detached_until_inserted() {
        let mut doc = parse_document("<main/>").expect("parse");
        let main = doc.query_selector("main").expect("query").expect("main exists");
        let nodes = doc.parse_fragment("<em>hi</em> there").expect("fragment");
        assert_eq!(nodes.len(), 2);
        assert!(!doc.is_connected(nodes[0]));
        for node in nodes {
            doc.append_child(main, node);
        }
        assert_eq!(doc.inner_html(main), "<em>hi</em> there");
    }
}
