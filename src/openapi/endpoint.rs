//! Resolved operations and their response tables.

use crate::openapi::document::{Parameter, Response};
use indexmap::IndexMap;
use serde::Serialize;

/// One method + path template entry, derived from the specification at load time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    pub responses: ResponseTable,
}

/// Status key (`"200"`, `"4XX"`, `"default"`) → response descriptor, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResponseTable {
    entries: IndexMap<String, Response>,
}

impl ResponseTable {
    pub fn new(entries: IndexMap<String, Response>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&Response> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Descriptor for a status: exact code → `NXX` family → `default` →
    /// preferred 2xx → first entry.
    pub fn select(&self, status: u16) -> Option<&Response> {
        if self.entries.is_empty() {
            return None;
        }

        if let Some(exact) = self.entries.get(&status.to_string()) {
            return Some(exact);
        }

        let family = status / 100;
        let ranged = self
            .entries
            .iter()
            .find(|(key, _)| family_digit(key) == Some(family))
            .map(|(_, response)| response);
        if ranged.is_some() {
            return ranged;
        }

        if let Some(default) = self.entries.get("default") {
            return Some(default);
        }

        self.preferred_success()
            .or_else(|| self.entries.values().next())
    }

    /// `200`, then `201`, then the first declared 2xx key (numeric or `2XX`).
    pub fn preferred_success(&self) -> Option<&Response> {
        ["200", "201"]
            .iter()
            .find_map(|key| self.entries.get(*key))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| is_success_key(key))
                    .map(|(_, response)| response)
            })
    }

    /// Success status to report: `200`, then `201`, then the lowest declared 2xx code.
    /// A bare `2XX` counts as `200`; no success entry at all also yields `200`.
    pub fn success_status(&self) -> u16 {
        if self.entries.contains_key("200") {
            return 200;
        }
        if self.entries.contains_key("201") {
            return 201;
        }
        self.entries
            .keys()
            .filter(|key| is_success_key(key))
            .map(|key| key.parse::<u16>().unwrap_or(200))
            .min()
            .unwrap_or(200)
    }
}

/// Leading digit of a range key such as `4XX` (case-insensitive).
fn family_digit(key: &str) -> Option<u16> {
    let bytes = key.as_bytes();
    if bytes.len() == 3 && bytes[1].eq_ignore_ascii_case(&b'x') && bytes[2].eq_ignore_ascii_case(&b'x')
    {
        (bytes[0] as char).to_digit(10).map(|d| d as u16)
    } else {
        None
    }
}

fn is_success_key(key: &str) -> bool {
    match key.parse::<u16>() {
        Ok(code) => (200..300).contains(&code),
        Err(_) => family_digit(key) == Some(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(text: &str) -> Response {
        Response {
            description: Some(text.to_string()),
            ..Response::default()
        }
    }

    fn table(keys: &[(&str, &str)]) -> ResponseTable {
        ResponseTable::new(
            keys.iter()
                .map(|(k, d)| (k.to_string(), described(d)))
                .collect(),
        )
    }

    fn description(response: Option<&Response>) -> Option<&str> {
        response.and_then(|r| r.description.as_deref())
    }

    #[test]
    fn test_family_beats_default() {
        let responses = table(&[("200", "A"), ("2XX", "B"), ("default", "C")]);
        assert_eq!(description(responses.select(201)), Some("B"));
        assert_eq!(description(responses.select(200)), Some("A"));
        assert_eq!(description(responses.select(404)), Some("C"));
    }

    #[test]
    fn test_falls_back_to_success_then_first() {
        let responses = table(&[("404", "missing"), ("202", "accepted")]);
        assert_eq!(description(responses.select(500)), Some("accepted"));

        let errors_only = table(&[("404", "missing"), ("409", "conflict")]);
        assert_eq!(description(errors_only.select(500)), Some("missing"));
    }

    #[test]
    fn test_lowercase_range_key() {
        let responses = table(&[("200", "ok"), ("4xx", "client")]);
        assert_eq!(description(responses.select(422)), Some("client"));
    }

    #[test]
    fn test_empty_table_selects_nothing() {
        assert!(ResponseTable::default().select(200).is_none());
    }

    #[test]
    fn test_success_status_preference() {
        assert_eq!(table(&[("201", ""), ("200", "")]).success_status(), 200);
        assert_eq!(table(&[("204", ""), ("201", "")]).success_status(), 201);
        assert_eq!(table(&[("404", ""), ("204", ""), ("202", "")]).success_status(), 202);
        assert_eq!(table(&[("2XX", "")]).success_status(), 200);
        assert_eq!(table(&[("default", "")]).success_status(), 200);
        assert_eq!(ResponseTable::default().success_status(), 200);
    }
}
