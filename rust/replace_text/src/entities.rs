// Escaping for the five markup-sensitive characters.
//
// Text read back from the DOM is already decoded, so it is escaped again before
// matching and decoded once more before it is written back as plain text.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;

pub struct EntityMap {
    escape: HashMap<char, &'static str>,
    unescape: HashMap<&'static str, char>,
    unescape_re: Regex,
}

const ENTITIES: [(char, &str); 5] = [
    ('>', "&gt;"),
    ('<', "&lt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
    ('&', "&amp;"),
];

impl EntityMap {
    fn build() -> Self {
        let mut escape = HashMap::new();
        let mut unescape = HashMap::new();
        for (ch, entity) in ENTITIES {
            escape.insert(ch, entity);
            unescape.insert(entity, ch);
        }
        let alternation = ENTITIES
            .iter()
            .map(|(_, entity)| regex::escape(entity))
            .collect::<Vec<_>>()
            .join("|");
        // The alternation is built from fixed literals and always compiles.
        let unescape_re = Regex::new(&format!("({alternation})")).unwrap();
        EntityMap {
            escape,
            unescape,
            unescape_re,
        }
    }

    pub fn entity_for(&self, ch: char) -> Option<&'static str> {
        self.escape.get(&ch).copied()
    }

    pub fn char_for(&self, entity: &str) -> Option<char> {
        self.unescape.get(entity).copied()
    }
}

lazy_static! {
    pub static ref ENTITY_MAP: EntityMap = EntityMap::build();
}

pub fn escape(text: &str) -> Cow<'_, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    let Some(first) = text.find(|c: char| ENTITY_MAP.entity_for(c).is_some()) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..first]);
    for ch in text[first..].chars() {
        match ENTITY_MAP.entity_for(ch) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

pub fn unescape(text: &str) -> Cow<'_, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    ENTITY_MAP
        .unescape_re
        .replace_all(text, |caps: &regex::Captures| {
            ENTITY_MAP
                .char_for(&caps[0])
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
}
