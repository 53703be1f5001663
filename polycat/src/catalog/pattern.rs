// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SQL `LIKE` name patterns

use super::error::{CatalogError, CatalogResult};
use regex::Regex;

/// A compiled `LIKE` pattern; `%` matches any run of characters, `_` exactly one
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> CatalogResult<Self> {
        Self::compile(pattern, false)
    }

    /// Case-insensitive variant, for lookups in case-insensitive namespaces
    pub fn case_insensitive(pattern: &str) -> CatalogResult<Self> {
        Self::compile(pattern, true)
    }

    fn compile(pattern: &str, ignore_case: bool) -> CatalogResult<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        if ignore_case {
            expr.push_str("(?i)");
        }
        expr.push('^');
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => expr.push_str(&regex::escape(&escaped.to_string())),
                    None => expr.push_str(&regex::escape("\\")),
                },
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr).map_err(|e| {
            CatalogError::InvalidParameters(format!("invalid pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// `None` matches everything
pub(crate) fn matches(pattern: Option<&Pattern>, name: &str) -> bool {
    pattern.map_or(true, |p| p.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_wildcards() {
        let p = Pattern::new("em%").unwrap();
        assert!(p.matches("emps"));
        assert!(p.matches("em"));
        assert!(!p.matches("depts"));

        let p = Pattern::new("_ame").unwrap();
        assert!(p.matches("name"));
        assert!(!p.matches("ame"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let p = Pattern::new("a.b").unwrap();
        assert!(p.matches("a.b"));
        assert!(!p.matches("axb"));

        let p = Pattern::new(r"\_id\_").unwrap();
        assert!(p.matches("_id_"));
        assert!(!p.matches("xidx"));

        assert!(Pattern::case_insensitive("EMPS").unwrap().matches("emps"));
    }
}
