// String substitution following JavaScript's `String.prototype.replace`.
//
// A Search is a literal substring (first occurrence only) or a compiled
// pattern, which replaces every match when built with the `g` flag. A
// Replacement is a template understanding the `$` tokens or a callback.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;

#[derive(Clone, Debug)]
pub enum Search {
    Literal(String),
    Pattern { regex: Regex, global: bool },
}

/// A single match handed to a replacement.
#[derive(Clone, Debug)]
pub struct Found<'h> {
    pub matched: &'h str,
    /// Capture groups 1..n; unmatched groups are `None`.
    pub groups: Vec<Option<&'h str>>,
    pub named: Vec<(&'h str, Option<&'h str>)>,
    /// Byte offset of the match in `input`.
    pub offset: usize,
    pub input: &'h str,
}

impl<'h> Found<'h> {
    pub fn group(&self, index: usize) -> Option<&'h str> {
        if index == 0 {
            return Some(self.matched);
        }
        self.groups.get(index - 1).copied().flatten()
    }

    pub fn name(&self, name: &str) -> Option<&'h str> {
        self.named
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| *v)
    }

    pub fn before(&self) -> &'h str {
        &self.input[..self.offset]
    }

    pub fn after(&self) -> &'h str {
        &self.input[self.offset + self.matched.len()..]
    }
}

pub enum Replacement {
    Literal(String),
    Callback(Box<dyn Fn(&Found<'_>) -> String>),
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Replacement::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl Replacement {
    pub fn literal(template: impl Into<String>) -> Self {
        Replacement::Literal(template.into())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Found<'_>) -> String + 'static,
    {
        Replacement::Callback(Box::new(f))
    }

    fn render(&self, found: &Found<'_>, out: &mut String) {
        match self {
            Replacement::Literal(template) => expand_template(template, found, out),
            Replacement::Callback(f) => out.push_str(&f(found)),
        }
    }
}

impl From<&str> for Replacement {
    fn from(s: &str) -> Self {
        Replacement::literal(s)
    }
}

impl From<String> for Replacement {
    fn from(s: String) -> Self {
        Replacement::Literal(s)
    }
}

impl From<&str> for Search {
    fn from(s: &str) -> Self {
        Search::literal(s)
    }
}

impl From<String> for Search {
    fn from(s: String) -> Self {
        Search::Literal(s)
    }
}

impl From<Regex> for Search {
    fn from(regex: Regex) -> Self {
        Search::Pattern {
            regex,
            global: false,
        }
    }
}

impl Search {
    pub fn literal(needle: impl Into<String>) -> Self {
        Search::Literal(needle.into())
    }

    /// Compiles `source` with JavaScript-style `flags` (`g`, `i`, `m`, `s`, `u`).
    ///
    /// The syntax is the `regex` crate's, so lookaround and in-pattern
    /// backreferences are unavailable. `\d`, `\w`, `\b` and their negations
    /// are narrowed to ASCII as in JavaScript; `\s` and case folding under `i`
    /// stay Unicode-aware.
    pub fn regex(source: &str, flags: &str) -> Result<Self> {
        let mut seen = String::new();
        let mut builder = RegexBuilder::new(&ascii_classes(source));
        let mut global = false;
        for flag in flags.chars() {
            if seen.contains(flag) {
                return Err(Error::DuplicateFlag(flag));
            }
            seen.push(flag);
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'u' => {}
                other => return Err(Error::UnsupportedFlag(other)),
            }
        }
        Ok(Search::Pattern {
            regex: builder.build()?,
            global,
        })
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Search::Pattern { global: true, .. })
    }

    /// Substitutes matches of `self` in `haystack`.
    pub fn replace(&self, haystack: &str, replacement: &Replacement) -> String {
        let mut out = String::with_capacity(haystack.len());
        let mut last = 0;
        let mut emit = |found: Found<'_>, out: &mut String| {
            out.push_str(&haystack[last..found.offset]);
            replacement.render(&found, out);
            last = found.offset + found.matched.len();
        };

        match self {
            Search::Literal(needle) => {
                if let Some(offset) = haystack.find(needle.as_str()) {
                    let found = Found {
                        matched: &haystack[offset..offset + needle.len()],
                        groups: Vec::new(),
                        named: Vec::new(),
                        offset,
                        input: haystack,
                    };
                    emit(found, &mut out);
                }
            }
            Search::Pattern { regex, global } => {
                let limit = if *global { usize::MAX } else { 1 };
                for caps in regex.captures_iter(haystack).take(limit) {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    let groups = (1..caps.len())
                        .map(|i| caps.get(i).map(|m| m.as_str()))
                        .collect();
                    let named = regex
                        .capture_names()
                        .enumerate()
                        .filter_map(|(i, name)| {
                            name.map(|n| (n, caps.get(i).map(|m| m.as_str())))
                        })
                        .collect();
                    let found = Found {
                        matched: whole.as_str(),
                        groups,
                        named,
                        offset: whole.start(),
                        input: haystack,
                    };
                    emit(found, &mut out);
                }
            }
        }

        out.push_str(&haystack[last..]);
        out
    }
}

// Rewrites the Perl classes whose JavaScript meaning is ASCII-only.
fn ascii_classes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_class = false;
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(ch);
                    break;
                };
                match next {
                    'd' => out.push_str("[0-9]"),
                    'D' => out.push_str("[^0-9]"),
                    'w' => out.push_str("[0-9A-Za-z_]"),
                    'W' => out.push_str("[^0-9A-Za-z_]"),
                    'b' if !in_class => out.push_str("(?-u:\\b)"),
                    'B' if !in_class => out.push_str("(?-u:\\B)"),
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(ch);
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn expand_template(template: &str, found: &Found<'_>, out: &mut String) {
    let group_count = found.groups.len();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let bytes = tail.as_bytes();

        match bytes.first() {
            Some(b'$') => {
                out.push('$');
                rest = &tail[1..];
            }
            Some(b'&') => {
                out.push_str(found.matched);
                rest = &tail[1..];
            }
            Some(b'`') => {
                out.push_str(found.before());
                rest = &tail[1..];
            }
            Some(b'\'') => {
                out.push_str(found.after());
                rest = &tail[1..];
            }
            Some(d) if d.is_ascii_digit() => {
                let one = (d - b'0') as usize;
                let two = bytes
                    .get(1)
                    .filter(|b| b.is_ascii_digit())
                    .map(|b| one * 10 + (b - b'0') as usize);
                match two {
                    Some(n) if n >= 1 && n <= group_count => {
                        out.push_str(found.group(n).unwrap_or(""));
                        rest = &tail[2..];
                    }
                    _ if one >= 1 && one <= group_count => {
                        out.push_str(found.group(one).unwrap_or(""));
                        rest = &tail[1..];
                    }
                    _ => {
                        out.push('$');
                        rest = tail;
                    }
                }
            }
            Some(b'<') if !found.named.is_empty() => match tail.find('>') {
                Some(close) => {
                    out.push_str(found.name(&tail[1..close]).unwrap_or(""));
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('$');
                    rest = tail;
                }
            },
            _ => {
                out.push('$');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
}
