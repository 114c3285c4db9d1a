//! Property tests for routing specificity and status descriptor precedence

use proptest::prelude::*;
use synthmock::openapi::EndpointIndex;

fn spec_with_paths(paths: &[&str]) -> String {
    let mut spec = String::from("{\"openapi\":\"3.0.0\",\"paths\":{");
    let entries: Vec<String> = paths
        .iter()
        .map(|path| {
            format!(
                "\"{}\":{{\"get\":{{\"operationId\":\"{}\",\"responses\":{{\"200\":{{\"description\":\"ok\"}}}}}}}}",
                path, path
            )
        })
        .collect();
    spec.push_str(&entries.join(","));
    spec.push_str("}}");
    spec
}

/// A literal template always beats a wildcard template of the same shape,
/// whichever is declared first.
#[test]
fn test_literal_beats_wildcard_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[a-z]{1,8}", "[a-z]{1,12}", any::<bool>()),
            |(collection, literal, literal_first)| {
                let wildcard = format!("/{}/{{id}}", collection);
                let exact = format!("/{}/{}", collection, literal);
                let paths = if literal_first {
                    vec![exact.as_str(), wildcard.as_str()]
                } else {
                    vec![wildcard.as_str(), exact.as_str()]
                };
                let index = EndpointIndex::from_text(&spec_with_paths(&paths));

                let endpoint = index.resolve("GET", &exact).expect("literal path resolves");
                prop_assert_eq!(endpoint.path.as_str(), exact.as_str());

                let other = format!("/{}/{}x", collection, literal);
                let endpoint = index.resolve("GET", &other).expect("wildcard path resolves");
                prop_assert_eq!(endpoint.path.as_str(), wildcard.as_str());
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// Resolution never panics and any match is a declared template that
    /// matches the request.
    #[test]
    fn test_resolution_is_total(path in "(/[a-z0-9{}]{0,6}){0,4}") {
        let index = EndpointIndex::from_text(&spec_with_paths(&[
            "/items/{id}",
            "/items/special",
            "/items/{id}/parts/{part}",
            "/{any}",
        ]));
        if let Some(endpoint) = index.resolve("GET", &path) {
            prop_assert!(index.endpoints().iter().any(|e| e.path == endpoint.path));
        }
    }
}

#[test]
fn test_status_override_family_match_beats_default() {
    let index = EndpointIndex::from_text(
        r#"{"openapi":"3.0.0","paths":{"/r":{"get":{"responses":{
            "200":{"description":"A"},
            "2XX":{"description":"B"},
            "default":{"description":"C"}
        }}}}}"#,
    );
    let endpoint = index.resolve("GET", "/r").unwrap();
    assert_eq!(
        endpoint.responses.select(201).and_then(|r| r.description.as_deref()),
        Some("B")
    );
    assert_eq!(
        endpoint.responses.select(200).and_then(|r| r.description.as_deref()),
        Some("A")
    );
    assert_eq!(
        endpoint.responses.select(503).and_then(|r| r.description.as_deref()),
        Some("C")
    );
}
