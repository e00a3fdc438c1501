//! inplace HTML Parser
//!
//! HTML5 parsing built on html5ever. Markup is converted into the arena DOM
//! of `inplace-dom`; inserting a parsed fragment is an ordinary childList
//! mutation, so observers see it like `innerHTML` assignment.

mod parser;

pub use parser::HtmlParser;

use inplace_dom::{Document, DomError, DomTree, NodeId};

/// Parse an HTML string into a Document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Replace the children of `element` with parsed markup
pub fn set_inner_html(tree: &mut DomTree, element: NodeId, html: &str) -> Result<Vec<NodeId>, ParseError> {
    tree.clear_children(element)?;
    append_html(tree, element, html)
}

/// Parse markup and append the resulting nodes to `parent`
pub fn append_html(tree: &mut DomTree, parent: NodeId, html: &str) -> Result<Vec<NodeId>, ParseError> {
    let nodes = HtmlParser::new().parse_fragment(tree, html)?;
    for &node in &nodes {
        tree.append_child(parent, node)?;
    }
    Ok(nodes)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsed document has no body element")]
    MissingBody,

    #[error(transparent)]
    Dom(#[from] DomError),
}
