//! Schema Translator
//!
//! Converts OpenAPI schema objects into draft-07 JSON Schema documents (the
//! "neutral" form handed to generation and validation). Translation never
//! fails outward: internal errors degrade to an empty document.

use crate::error::SchemaError;
use crate::openapi::document::{AdditionalProperties, Schema};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::error;

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

const COMPONENT_PREFIX: &str = "#/components/schemas/";
const MAX_DEPTH: usize = 64;

/// Translate a single schema node. Unresolved `$ref`s are kept as pointers.
pub fn translate(schema: &Schema) -> Value {
    match convert(schema, 0) {
        Ok(node) => Value::Object(node),
        Err(e) => {
            error!(error = %e, "Error converting OpenAPI schema to JSON Schema");
            json!({})
        }
    }
}

/// Translate a root schema into a complete draft-07 document.
///
/// Component schemas reachable from the root are translated into a
/// `components.schemas` section so the preserved `#/components/schemas/X`
/// pointers resolve inside the document itself.
pub fn translate_document(schema: &Schema, components: Option<&IndexMap<String, Schema>>) -> Value {
    match build_document(schema, components) {
        Ok(document) => document,
        Err(e) => {
            error!(error = %e, "Error converting OpenAPI schema to JSON Schema");
            json!({})
        }
    }
}

/// Pretty-printed document text; `{}` if serialization fails.
pub fn to_schema_text(document: &Value) -> String {
    serde_json::to_string_pretty(document).unwrap_or_else(|_| "{}".to_string())
}

fn build_document(
    schema: &Schema,
    components: Option<&IndexMap<String, Schema>>,
) -> Result<Value, SchemaError> {
    let mut root = Map::new();
    root.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
    root.extend(convert(schema, 0)?);

    if let Some(components) = components {
        let embedded = embed_components(schema, components)?;
        if !embedded.is_empty() {
            root.insert(
                "components".to_string(),
                json!({ "schemas": Value::Object(embedded) }),
            );
        }
    }

    Ok(Value::Object(root))
}

fn embed_components(
    root: &Schema,
    components: &IndexMap<String, Schema>,
) -> Result<Map<String, Value>, SchemaError> {
    let mut pending = Vec::new();
    collect_component_refs(root, &mut pending);

    let mut seen: HashSet<String> = HashSet::new();
    let mut embedded = Map::new();
    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(component) = components.get(&name) {
            collect_component_refs(component, &mut pending);
            embedded.insert(name, Value::Object(convert(component, 0)?));
        }
    }
    embedded.sort_keys();
    Ok(embedded)
}

fn collect_component_refs(schema: &Schema, out: &mut Vec<String>) {
    if let Some(name) = schema
        .reference
        .as_deref()
        .and_then(|r| r.strip_prefix(COMPONENT_PREFIX))
    {
        out.push(name.to_string());
    }
    if let Some(items) = &schema.items {
        collect_component_refs(items, out);
    }
    if let Some(properties) = &schema.properties {
        for property in properties.values() {
            collect_component_refs(property, out);
        }
    }
    if let Some(AdditionalProperties::Schema(extra)) = &schema.additional_properties {
        collect_component_refs(extra, out);
    }
    for branch in [&schema.all_of, &schema.any_of, &schema.one_of]
        .into_iter()
        .flatten()
        .flatten()
    {
        collect_component_refs(branch, out);
    }
    if let Some(not) = &schema.not {
        collect_component_refs(not, out);
    }
}

fn convert(s: &Schema, depth: usize) -> Result<Map<String, Value>, SchemaError> {
    if depth > MAX_DEPTH {
        return Err(SchemaError::TooDeep(MAX_DEPTH));
    }

    let mut n = Map::new();

    if let Some(reference) = &s.reference {
        n.insert("$ref".to_string(), Value::String(reference.clone()));
        return Ok(n);
    }

    put_text(&mut n, "title", &s.title);
    put_text(&mut n, "description", &s.description);
    put_text(&mut n, "format", &s.format);
    if let Some(default) = &s.default {
        n.insert("default".to_string(), default.clone());
    }
    if let Some(example) = &s.example {
        n.insert("example".to_string(), example.clone());
    }
    put_flag(&mut n, "deprecated", s.deprecated);
    put_flag(&mut n, "readOnly", s.read_only);
    put_flag(&mut n, "writeOnly", s.write_only);
    if let Some(multiple_of) = &s.multiple_of {
        n.insert("multipleOf".to_string(), Value::Number(multiple_of.clone()));
    }
    if let Some(values) = s.enumeration.as_ref().filter(|v| !v.is_empty()) {
        n.insert("enum".to_string(), Value::Array(values.clone()));
    }

    // Composition keywords may sit next to type/properties on the same node.
    for (keyword, branches) in [
        ("allOf", &s.all_of),
        ("anyOf", &s.any_of),
        ("oneOf", &s.one_of),
    ] {
        if let Some(branches) = branches.as_ref().filter(|b| !b.is_empty()) {
            let translated = branches
                .iter()
                .map(|b| convert(b, depth + 1).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            n.insert(keyword.to_string(), Value::Array(translated));
        }
    }
    if let Some(not) = &s.not {
        n.insert("not".to_string(), Value::Object(convert(not, depth + 1)?));
    }

    let nullable = s.nullable == Some(true);
    match (&s.schema_type, nullable) {
        (Some(ty), true) => {
            n.insert("type".to_string(), json!([ty, "null"]));
        }
        (Some(ty), false) => {
            n.insert("type".to_string(), Value::String(ty.clone()));
        }
        (None, true) => {
            n.insert("type".to_string(), json!(["null"]));
        }
        (None, false) => {}
    }

    match (&s.minimum, s.exclusive_minimum == Some(true)) {
        (Some(min), true) => {
            n.insert("exclusiveMinimum".to_string(), Value::Number(min.clone()));
        }
        (Some(min), false) => {
            n.insert("minimum".to_string(), Value::Number(min.clone()));
        }
        (None, _) => {}
    }
    match (&s.maximum, s.exclusive_maximum == Some(true)) {
        (Some(max), true) => {
            n.insert("exclusiveMaximum".to_string(), Value::Number(max.clone()));
        }
        (Some(max), false) => {
            n.insert("maximum".to_string(), Value::Number(max.clone()));
        }
        (None, _) => {}
    }

    if let Some(min_length) = s.min_length {
        n.insert("minLength".to_string(), json!(min_length));
    }
    if let Some(max_length) = s.max_length {
        n.insert("maxLength".to_string(), json!(max_length));
    }
    put_text(&mut n, "pattern", &s.pattern);

    if s.is_type("array") || s.items.is_some() {
        if let Some(items) = &s.items {
            n.insert("items".to_string(), Value::Object(convert(items, depth + 1)?));
        }
        if let Some(min_items) = s.min_items {
            n.insert("minItems".to_string(), json!(min_items));
        }
        if let Some(max_items) = s.max_items {
            n.insert("maxItems".to_string(), json!(max_items));
        }
        if let Some(unique) = s.unique_items {
            n.insert("uniqueItems".to_string(), Value::Bool(unique));
        }
    }

    if s.is_type("object") || s.properties.is_some() || s.additional_properties.is_some() {
        let mut properties = Map::new();
        if let Some(declared) = &s.properties {
            for (name, property) in declared {
                properties.insert(name.clone(), Value::Object(convert(property, depth + 1)?));
            }
        }
        n.insert("properties".to_string(), Value::Object(properties));

        if let Some(required) = s.required.as_ref().filter(|r| !r.is_empty()) {
            n.insert("required".to_string(), json!(required));
        }

        match &s.additional_properties {
            Some(AdditionalProperties::Allowed(allowed)) => {
                n.insert("additionalProperties".to_string(), Value::Bool(*allowed));
            }
            Some(AdditionalProperties::Schema(extra)) => {
                n.insert(
                    "additionalProperties".to_string(),
                    Value::Object(convert(extra, depth + 1)?),
                );
            }
            None => {}
        }
    }

    Ok(n)
}

fn put_text(n: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(text) = value.as_ref().filter(|t| !t.trim().is_empty()) {
        n.insert(key.to_string(), Value::String(text.clone()));
    }
}

fn put_flag(n: &mut Map<String, Value>, key: &str, value: Option<bool>) {
    if value == Some(true) {
        n.insert(key.to_string(), Value::Bool(true));
    }
}
