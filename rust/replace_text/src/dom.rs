// Thin layer over the html5ever / rcdom tree: enumeration, mutation and
// serialization of the nodes the replacer touches.

use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::rc::Rc;

use crate::replace::Selection;

pub struct Document {
    dom: RcDom,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Document {
            dom: parse_to_dom(html),
        }
    }

    pub fn root(&self) -> Handle {
        self.dom.document.clone()
    }

    pub fn body(&self) -> Option<Handle> {
        find_elem(&self.dom.document, "body")
    }

    /// All elements named `tag`, in document order.
    pub fn select(&self, tag: &str) -> Selection {
        let mut found = Vec::new();
        collect_elems(&self.dom.document, tag, &mut found);
        Selection::new(found)
    }

    pub fn to_html(&self) -> String {
        inner_html(&self.dom.document)
    }

    pub fn body_html(&self) -> String {
        self.body().map(|b| inner_html(&b)).unwrap_or_default()
    }
}

fn parse_to_dom(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

fn find_elem(node: &Handle, name: &str) -> Option<Handle> {
    if elem_tag_lower(node).is_some_and(|t| t.eq_ignore_ascii_case(name)) {
        return Some(node.clone());
    }
    for c in node.children.borrow().iter() {
        if let Some(x) = find_elem(c, name) {
            return Some(x);
        }
    }
    None
}

fn collect_elems(node: &Handle, name: &str, out: &mut Vec<Handle>) {
    if elem_tag_lower(node).is_some_and(|t| t.eq_ignore_ascii_case(name)) {
        out.push(node.clone());
    }
    for c in node.children.borrow().iter() {
        collect_elems(c, name, out);
    }
}

pub fn children(h: &Handle) -> Vec<Handle> {
    h.children.borrow().clone()
}

pub fn elem_tag_lower(h: &Handle) -> Option<String> {
    match &h.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn is_text(h: &Handle) -> bool {
    matches!(h.data, NodeData::Text { .. })
}

pub fn text_of(h: &Handle) -> Option<String> {
    match &h.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// Overwrites the value of a text node. Other node kinds are left alone.
pub fn set_text(h: &Handle, value: &str) {
    if let NodeData::Text { contents } = &h.data {
        *contents.borrow_mut() = StrTendril::from_slice(value);
    }
}

pub fn parent_of(h: &Handle) -> Option<Handle> {
    let weak = h.parent.take()?;
    let parent = weak.upgrade();
    h.parent.set(Some(weak));
    parent
}

fn index_in_parent(parent: &Handle, h: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, h))
}

/// Parses `markup` as body content and returns the detached top-level nodes.
pub fn parse_markup(markup: &str) -> Vec<Handle> {
    // The explicit <body> keeps leading whitespace, which the parser would
    // otherwise drop before the implied body starts.
    let dom = parse_to_dom(&format!("<body>{markup}"));
    let Some(body) = find_elem(&dom.document, "body") else {
        return Vec::new();
    };
    // Take the children out before `dom` drops: dropping an rcdom node also
    // empties the child lists of its descendants.
    let nodes = std::mem::take(&mut *body.children.borrow_mut());
    for n in &nodes {
        n.parent.set(None);
    }
    nodes
}

/// Parses `markup` and inserts the resulting nodes right before `node`.
/// Returns the number of nodes inserted; zero if `node` has no parent.
pub fn insert_markup_before(node: &Handle, markup: &str) -> usize {
    let Some(parent) = parent_of(node) else {
        return 0;
    };
    let Some(index) = index_in_parent(&parent, node) else {
        return 0;
    };
    let nodes = parse_markup(markup);
    let count = nodes.len();
    let mut kids = parent.children.borrow_mut();
    for (offset, n) in nodes.into_iter().enumerate() {
        n.parent.set(Some(Rc::downgrade(&parent)));
        kids.insert(index + offset, n);
    }
    count
}

/// Removes `node` from its parent. Detached nodes are ignored.
pub fn detach(node: &Handle) {
    let Some(parent) = parent_of(node) else {
        return;
    };
    node.parent.set(None);
    if let Some(index) = index_in_parent(&parent, node) {
        parent.children.borrow_mut().remove(index);
    }
}

fn esc_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn esc_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text(tag: &str) -> bool {
    matches!(
        tag,
        "script"
            | "style"
            | "xmp"
            | "iframe"
            | "noembed"
            | "noframes"
            | "plaintext"
            // The parser runs with scripting enabled, so <noscript> holds raw text.
            | "noscript"
    )
}

fn serialize_node(out: &mut String, node: &Handle, raw: bool) {
    match &node.data {
        NodeData::Document => serialize_children(out, node, false),
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text { contents } => {
            let text = contents.borrow();
            if raw {
                out.push_str(&text);
            } else {
                out.push_str(&esc_text(&text));
            }
        }
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, contents } => {
            out.push_str("<?");
            out.push_str(target);
            out.push(' ');
            out.push_str(contents);
            out.push('>');
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            out.push('<');
            out.push_str(&tag);
            for attr in attrs.borrow().iter() {
                out.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    out.push_str(prefix);
                    out.push(':');
                }
                out.push_str(&attr.name.local);
                out.push_str("=\"");
                out.push_str(&esc_attr(&attr.value));
                out.push('"');
            }
            out.push('>');
            if is_void(&tag) {
                return;
            }
            serialize_children(out, node, is_raw_text(&tag));
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

/// Children as written out: a <template> keeps them in its content fragment.
fn content_children(node: &Handle) -> Vec<Handle> {
    if let NodeData::Element {
        template_contents, ..
    } = &node.data
    {
        if let Some(contents) = template_contents.borrow().as_ref() {
            return children(contents);
        }
    }
    children(node)
}

fn serialize_children(out: &mut String, node: &Handle, raw: bool) {
    for c in content_children(node) {
        serialize_node(out, &c, raw);
    }
}

pub fn inner_html(node: &Handle) -> String {
    let mut out = String::new();
    serialize_children(&mut out, node, elem_tag_lower(node).is_some_and(|t| is_raw_text(&t)));
    out
}

pub fn outer_html(node: &Handle) -> String {
    let mut out = String::new();
    serialize_node(&mut out, node, false);
    out
}
