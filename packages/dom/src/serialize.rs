use crate::parse::is_void_element;
use crate::tree::{Dom, NodeId, NodeKind};

impl Dom {
    /// Serialize a subtree to HTML. Fragment nodes serialize as their
    /// children; text and attribute values are escaped.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize a node without its children: the outer tag for elements,
    /// the trimmed content for text nodes. Used for error context.
    pub fn to_html_shallow(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => {
                let mut out = String::new();
                self.write_open_tag(id, &mut out);
                if !is_void_element(tag) {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                out
            }
            NodeKind::Text { content } => content.trim().to_string(),
            NodeKind::Comment { content } => format!("<!--{}-->", content),
            NodeKind::Fragment { .. } => String::new(),
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Fragment { children } => {
                for &child in children {
                    self.write_node(child, out);
                }
            }
            NodeKind::Element { tag, children, .. } => {
                self.write_open_tag(id, out);
                if is_void_element(tag) {
                    return;
                }
                for &child in children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text { content } => out.push_str(&escape_text(content)),
            NodeKind::Comment { content } => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
        }
    }

    fn write_open_tag(&self, id: NodeId, out: &mut String) {
        if let NodeKind::Element { tag, attributes, .. } = self.kind(id) {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
        }
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
