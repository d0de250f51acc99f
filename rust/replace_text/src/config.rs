use markup5ever_rcdom::Handle;
use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::pattern::{Replacement, Search};
use crate::replace::replace_text;

/// A search, a replacement and the `text_only` switch, applied together.
#[derive(Debug)]
pub struct ReplacementRequest {
    pub search: Search,
    pub replace: Replacement,
    pub text_only: bool,
}

impl ReplacementRequest {
    pub fn new(search: impl Into<Search>, replace: impl Into<Replacement>, text_only: bool) -> Self {
        ReplacementRequest {
            search: search.into(),
            replace: replace.into(),
            text_only,
        }
    }

    pub fn apply<'a>(&self, elements: &'a [Handle]) -> &'a [Handle] {
        replace_text(elements, &self.search, &self.replace, self.text_only)
    }
}

fn default_tag() -> String {
    "body".to_string()
}

/// One entry of a JSON rules file.
#[derive(Clone, Debug, Deserialize)]
pub struct Rule {
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub text_only: bool,
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl TryFrom<&Rule> for ReplacementRequest {
    type Error = Error;

    fn try_from(rule: &Rule) -> Result<Self> {
        let search = if rule.regex {
            Search::regex(&rule.search, &rule.flags)?
        } else {
            Search::literal(rule.search.as_str())
        };
        Ok(ReplacementRequest::new(
            search,
            rule.replace.as_str(),
            rule.text_only,
        ))
    }
}

pub fn parse_rules(json: &str) -> Result<Vec<Rule>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let json = std::fs::read_to_string(path)?;
    parse_rules(&json)
}
