// Search-and-replace on the text content of HTML elements. Only the direct
// text children of the targeted elements are rewritten; tags, attributes and
// existing entity escaping are preserved.

mod config;
mod dom;
mod entities;
mod error;
mod pattern;
mod replace;

pub use config::{load_rules, parse_rules, ReplacementRequest, Rule};
pub use dom::{inner_html, outer_html, Document};
pub use entities::{escape, unescape, EntityMap, ENTITY_MAP};
pub use error::{Error, Result};
pub use pattern::{Found, Replacement, Search};
pub use replace::{replace_text, Selection};
