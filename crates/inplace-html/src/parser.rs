//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to our DOM format.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use inplace_dom::{Document, DomTree, NodeId};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = self.read(html)?;
        let mut document = Document::empty(url);
        let tree = document.tree_mut();
        let root = tree.root();
        for child in dom.document.children.borrow().iter() {
            if let Some(node) = self.convert_node(child, tree)? {
                tree.append_child(root, node)?;
            }
        }
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse body content into detached nodes of `tree`
    pub fn parse_fragment(&self, tree: &mut DomTree, html: &str) -> Result<Vec<NodeId>, ParseError> {
        let dom = self.read(html)?;
        let body = find_body(&dom.document).ok_or(ParseError::MissingBody)?;

        let mut nodes = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(node) = self.convert_node(child, tree)? {
                nodes.push(node);
            }
        }
        tracing::trace!("Parsed fragment into {} top-level nodes", nodes.len());
        Ok(nodes)
    }

    fn read(&self, html: &str) -> Result<RcDom, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    /// Convert an RcDom node (and its subtree) into detached nodes
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree) -> Result<Option<NodeId>, ParseError> {
        match &handle.data {
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(tree.create_text(&text)))
            }
            RcNodeData::Comment { contents } => Ok(Some(tree.create_comment(&contents.to_string()))),
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attribute(id, &attr.name.local, &attr.value)?;
                }
                for child in handle.children.borrow().iter() {
                    if let Some(node) = self.convert_node(child, tree)? {
                        tree.append_child(id, node)?;
                    }
                }
                Ok(Some(id))
            }
            // Doctype, processing instructions
            _ => Ok(None),
        }
    }
}

fn find_body(handle: &Handle) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if &*name.local == "body" {
            return Some(handle.clone());
        }
    }
    handle.children.borrow().iter().find_map(find_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html).unwrap();

        let body = doc.body().unwrap();
        assert_eq!(doc.tree().text_content(body), "Hello");
        assert!(doc.head().is_some());
    }

    #[test]
    fn test_parse_fragment_is_detached() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new()
            .parse_fragment(&mut tree, "<div title=\"t\"><span>Text</span></div> tail")
            .unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(tree.tag_name(nodes[0]), Some("div"));
        assert_eq!(tree.get_attribute(nodes[0], "title"), Some("t"));
        assert_eq!(tree.parent(nodes[0]), None);
        assert_eq!(tree.node_value(nodes[1]), Some(" tail"));
    }
}
