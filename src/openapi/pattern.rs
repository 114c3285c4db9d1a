//! Path template patterns
//!
//! Each `{param}` in a template becomes a wildcard matching exactly one path
//! segment. Matches are ranked by `10 × pattern length − 100 × wildcard count`.

use regex::Regex;

/// Compiled matcher for one declared path template
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    wildcard_form: String,
    wildcards: usize,
    matcher: Regex,
}

enum Part<'a> {
    Literal(&'a str),
    Param,
}

/// Split a template into literal runs and `{param}` placeholders.
fn split_template(template: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let close = match rest[open..].find('}') {
            Some(offset) if offset > 1 => open + offset,
            _ => break,
        };
        if open > 0 {
            parts.push(Part::Literal(&rest[..open]));
        }
        parts.push(Part::Param);
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest));
    }
    parts
}

impl PathPattern {
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let mut wildcard_form = String::with_capacity(template.len());
        let mut source = String::with_capacity(template.len() + 16);
        let mut wildcards = 0;

        source.push('^');
        for part in split_template(template) {
            match part {
                Part::Literal(text) => {
                    wildcard_form.push_str(text);
                    source.push_str(&regex::escape(text));
                }
                Part::Param => {
                    wildcards += 1;
                    wildcard_form.push('*');
                    source.push_str("[^/]+");
                }
            }
        }
        source.push('$');

        Ok(Self {
            template: template.to_string(),
            wildcard_form,
            wildcards,
            matcher: Regex::new(&source)?,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Template with every parameter replaced by `*`.
    pub fn wildcard_form(&self) -> &str {
        &self.wildcard_form
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcards
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Higher is more specific.
    pub fn specificity(&self) -> i64 {
        let length = self.wildcard_form.chars().count() as i64;
        10 * length - 100 * self.wildcards as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_matches_single_segment() {
        let pattern = PathPattern::compile("/pets/{id}").unwrap();
        assert!(pattern.matches("/pets/1"));
        assert!(pattern.matches("/pets/abc-def"));
        assert!(!pattern.matches("/pets/1/toys"));
        assert!(!pattern.matches("/pets/"));
        assert!(!pattern.matches("/pets"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = PathPattern::compile("/files/{name}.json").unwrap();
        assert!(pattern.matches("/files/report.json"));
        assert!(!pattern.matches("/files/reportxjson"));
        assert_eq!(pattern.wildcard_form(), "/files/*.json");
    }

    #[test]
    fn test_specificity_prefers_literals() {
        let literal = PathPattern::compile("/items/special").unwrap();
        let wildcard = PathPattern::compile("/items/{id}").unwrap();
        assert!(literal.specificity() > wildcard.specificity());
        assert_eq!(wildcard.specificity(), 10 * 8 - 100);
    }
}
