// Search-and-replace over the direct text children of elements. Markup in a
// replacement is parsed and inserted in place of the text node unless
// `text_only` is set, in which case it is written back as literal text.

use markup5ever_rcdom::Handle;
use tracing::{debug, trace};

use crate::dom::{children, detach, insert_markup_before, is_text, set_text, text_of};
use crate::entities::{escape, unescape};
use crate::pattern::{Replacement, Search};

/// Replaces text in each of `elements` and hands the same elements back.
pub fn replace_text<'a>(
    elements: &'a [Handle],
    search: &Search,
    replace: &Replacement,
    text_only: bool,
) -> &'a [Handle] {
    for element in elements {
        replace_in_element(element, search, replace, text_only);
    }
    elements
}

fn replace_in_element(element: &Handle, search: &Search, replace: &Replacement, text_only: bool) {
    let nodes = children(element);
    if nodes.is_empty() {
        return;
    }

    // Text nodes that were swapped for markup. Removed after the walk.
    let mut remove: Vec<Handle> = Vec::new();

    for node in nodes.iter().filter(|n| is_text(n)) {
        let Some(text) = text_of(node) else {
            continue;
        };
        let val = escape(&text);
        let new_val = search.replace(&val, replace);

        if new_val == val {
            trace!("text node unchanged");
            continue;
        }

        if !text_only && new_val.contains('<') {
            let inserted = insert_markup_before(node, &new_val);
            debug!(inserted, "replaced text node with markup");
            remove.push(node.clone());
        } else {
            set_text(node, &unescape(&new_val));
            debug!("rewrote text node");
        }
    }

    if !remove.is_empty() {
        debug!(count = remove.len(), "removing replaced text nodes");
        for node in &remove {
            detach(node);
        }
    }
}

/// An ordered set of elements, usually produced by [`crate::Document::select`].
#[derive(Clone, Default)]
pub struct Selection {
    nodes: Vec<Handle>,
}

impl Selection {
    pub fn new(nodes: Vec<Handle>) -> Self {
        Selection { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handle> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[Handle] {
        &self.nodes
    }

    pub fn replace_text(&self, search: &Search, replace: &Replacement, text_only: bool) -> &Self {
        replace_text(&self.nodes, search, replace, text_only);
        self
    }
}

impl From<Vec<Handle>> for Selection {
    fn from(nodes: Vec<Handle>) -> Self {
        Selection::new(nodes)
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Handle;
    type IntoIter = std::slice::Iter<'a, Handle>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, outer_html, Document};
    use std::rc::Rc;

    fn para(html: &str) -> (Document, Handle) {
        let doc = Document::parse(html);
        let p = doc.select("p").iter().next().cloned().unwrap();
        (doc, p)
    }

    fn lit(s: &str) -> Replacement {
        Replacement::literal(s)
    }

    #[test]
    fn replaces_text_around_untouched_elements() {
        let (_doc, p) = para("<p>a<b>bold</b>c</p>");
        let bold = children(&p)[1].clone();

        replace_text(std::slice::from_ref(&p), &Search::literal("a"), &lit("X"), false);

        let kids = children(&p);
        assert_eq!(kids.len(), 3);
        assert_eq!(text_of(&kids[0]).as_deref(), Some("X"));
        assert!(Rc::ptr_eq(&kids[1], &bold));
        assert_eq!(inner_html(&p), "X<b>bold</b>c");
    }

    #[test]
    fn nested_text_is_not_visited() {
        let (_doc, p) = para("<p>a<b>a</b>a</p>");
        let search = Search::regex("a", "g").unwrap();
        replace_text(std::slice::from_ref(&p), &search, &lit("z"), false);
        assert_eq!(inner_html(&p), "z<b>a</b>z");
    }

    #[test]
    fn markup_replacement_inserts_elements_in_place() {
        let (_doc, p) = para("<p><b>x</b>hello world<u>y</u></p>");
        let original = children(&p)[1].clone();

        replace_text(
            std::slice::from_ref(&p),
            &Search::literal("world"),
            &lit("<i>there</i>"),
            false,
        );

        let kids = children(&p);
        assert_eq!(kids.len(), 4);
        assert_eq!(outer_html(&kids[0]), "<b>x</b>");
        assert_eq!(text_of(&kids[1]).as_deref(), Some("hello "));
        assert_eq!(outer_html(&kids[2]), "<i>there</i>");
        assert_eq!(outer_html(&kids[3]), "<u>y</u>");
        assert!(kids.iter().all(|k| !Rc::ptr_eq(k, &original)));
        assert_eq!(inner_html(&p), "<b>x</b>hello <i>there</i><u>y</u>");
    }

    #[test]
    fn text_only_writes_markup_as_text() {
        let (_doc, p) = para("<p>hello world</p>");
        let original = children(&p)[0].clone();

        replace_text(
            std::slice::from_ref(&p),
            &Search::literal("world"),
            &lit("<i>there</i>"),
            true,
        );

        let kids = children(&p);
        assert_eq!(kids.len(), 1);
        assert!(Rc::ptr_eq(&kids[0], &original));
        assert_eq!(text_of(&kids[0]).as_deref(), Some("hello <i>there</i>"));
        assert_eq!(inner_html(&p), "hello &lt;i&gt;there&lt;/i&gt;");
    }

    #[test]
    fn existing_entities_are_not_double_escaped() {
        let (_doc, p) = para("<p>fish &amp; chips</p>");
        replace_text(std::slice::from_ref(&p), &Search::literal("chips"), &lit("fries"), false);
        assert_eq!(text_of(&children(&p)[0]).as_deref(), Some("fish & fries"));
        assert_eq!(inner_html(&p), "fish &amp; fries");
    }

    #[test]
    fn escaped_angle_brackets_survive_markup_path() {
        let (_doc, p) = para("<p>a &lt; b</p>");
        replace_text(std::slice::from_ref(&p), &Search::literal("b"), &lit("<em>b</em>"), false);
        assert_eq!(inner_html(&p), "a &lt; <em>b</em>");
    }

    #[test]
    fn search_sees_escaped_text() {
        let (_doc, p) = para("<p>1 &lt; 2</p>");
        replace_text(std::slice::from_ref(&p), &Search::literal("&lt;"), &lit("&gt;"), false);
        assert_eq!(text_of(&children(&p)[0]).as_deref(), Some("1 > 2"));
    }

    #[test]
    fn no_match_leaves_tree_identical() {
        let (_doc, p) = para("<p>one <b>two</b> three &amp; four<!--c--></p>");
        let before_html = inner_html(&p);
        let before_nodes = children(&p);

        replace_text(std::slice::from_ref(&p), &Search::literal("zzz"), &lit("<i>x</i>"), false);

        let after_nodes = children(&p);
        assert_eq!(inner_html(&p), before_html);
        assert_eq!(before_nodes.len(), after_nodes.len());
        assert!(before_nodes
            .iter()
            .zip(after_nodes.iter())
            .all(|(a, b)| Rc::ptr_eq(a, b)));
    }

    #[test]
    fn callback_replacement() {
        let (_doc, p) = para("<p>qty 3</p>");
        let search = Search::regex(r"\d+", "").unwrap();
        let double = Replacement::with(|m| {
            let n: i64 = m.matched.parse().unwrap_or(0);
            (n * 2).to_string()
        });
        replace_text(std::slice::from_ref(&p), &search, &double, false);
        assert_eq!(inner_html(&p), "qty 6");
    }

    #[test]
    fn back_references_in_markup() {
        let (_doc, p) = para("<p>see item 42 now</p>");
        let search = Search::regex(r"item (\d+)", "").unwrap();
        replace_text(
            std::slice::from_ref(&p),
            &search,
            &lit("<a href=\"#$1\">$&</a>"),
            false,
        );
        assert_eq!(inner_html(&p), "see <a href=\"#42\">item 42</a> now");
    }

    #[test]
    fn several_text_nodes_replaced_with_markup() {
        let (_doc, p) = para("<p>x<br>x<br>x</p>");
        replace_text(std::slice::from_ref(&p), &Search::literal("x"), &lit("<b>y</b>"), false);
        assert_eq!(inner_html(&p), "<b>y</b><br><b>y</b><br><b>y</b>");
        assert_eq!(children(&p).len(), 5);
    }

    #[test]
    fn empty_elements_are_skipped() {
        let (_doc, p) = para("<p></p>");
        replace_text(std::slice::from_ref(&p), &Search::literal(""), &lit("x"), false);
        assert_eq!(inner_html(&p), "");
    }

    #[test]
    fn selection_chains_and_processes_each_element() {
        let doc = Document::parse("<p>cat</p><div>cat</div><p>cat dog</p>");
        let ps = doc.select("p");
        ps.replace_text(&Search::literal("cat"), &lit("cow"), false)
            .replace_text(&Search::literal("dog"), &lit("<i>pig</i>"), false);

        assert_eq!(
            doc.body_html(),
            "<p>cow</p><div>cat</div><p>cow <i>pig</i></p>"
        );
    }

    #[test]
    fn returns_the_same_elements() {
        let doc = Document::parse("<p>a</p><p>b</p>");
        let ps = doc.select("p");
        let out = replace_text(ps.as_slice(), &Search::literal("a"), &lit("b"), false);
        assert_eq!(out.len(), 2);
        assert!(out.iter().zip(ps.iter()).all(|(a, b)| Rc::ptr_eq(a, b)));
    }
}
