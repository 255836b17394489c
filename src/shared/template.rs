//! `$placeholder` text templates used by badge descriptions.
//!
//! Editors write templates such as
//! `"Read ${left_count} more ${pluralize_stories_left}"`. Substitution is
//! forgiving: unknown placeholders and stray `$` signs are kept verbatim, and
//! `$$` renders a single `$`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// `$$`, `$name` or `${name}`; identifiers are ASCII letters, digits and underscores
    static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"\$(?:(\$)|([_a-zA-Z][_a-zA-Z0-9]*)|\{([_a-zA-Z][_a-zA-Z0-9]*)\})").unwrap();
}

/// Replace known placeholders, leaving everything else untouched. Never fails.
pub fn safe_substitute(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }

            let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match name.and_then(|n| values.get(n)) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// English plural choice: singular only for exactly one
pub fn pluralize<'a>(count: i64, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}
