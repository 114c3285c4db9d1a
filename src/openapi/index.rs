//! Endpoint Index
//!
//! Loads a specification and answers three questions for the pipeline: which
//! operation handles a request, what a `$ref` points at, and which schema a
//! response descriptor carries. Every miss is an explicit `None`; nothing in
//! here aborts a request.

use crate::error::SpecError;
use crate::openapi::document::{parse_document, OpenApiDocument, Parameter, Response, Schema};
use crate::openapi::endpoint::{Endpoint, ResponseTable};
use crate::openapi::pattern::PathPattern;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Serializable overview of an index
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    pub loaded: bool,
    pub title: Option<String>,
    pub version: Option<String>,
    pub endpoint_count: usize,
    pub operations: Vec<OperationSummary>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
}

struct Route {
    pattern: PathPattern,
    methods: HashMap<String, Endpoint>,
}

/// Pattern → operation index over one loaded specification
#[derive(Default)]
pub struct EndpointIndex {
    document: Option<OpenApiDocument>,
    routes: Vec<Route>,
    diagnostics: Vec<String>,
}

impl EndpointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from specification text. Failures yield an empty index
    /// carrying diagnostics.
    pub fn from_text(spec_text: &str) -> Self {
        let mut index = Self::new();
        index.load(spec_text);
        index
    }

    pub fn from_file(path: &Path) -> Self {
        let mut index = Self::new();
        index.load_file(path);
        index
    }

    /// Replace the current specification with one parsed from text.
    pub fn load(&mut self, spec_text: &str) {
        match parse_document(spec_text) {
            Ok(document) => self.index_document(document),
            Err(e) => self.fail(e),
        }
    }

    /// Replace the current specification with one read from a file.
    pub fn load_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(text) => self.load(&text),
            Err(source) => self.fail(SpecError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn fail(&mut self, error: SpecError) {
        warn!(error = %error, "Specification load failed; index cleared");
        self.document = None;
        self.routes.clear();
        self.diagnostics = vec![error.to_string()];
    }

    fn index_document(&mut self, document: OpenApiDocument) {
        let mut routes = Vec::with_capacity(document.paths.len());
        let mut diagnostics = Vec::new();

        for (template, item) in &document.paths {
            let pattern = match PathPattern::compile(template) {
                Ok(pattern) => pattern,
                Err(e) => {
                    diagnostics.push(format!("Skipping path {}: {}", template, e));
                    continue;
                }
            };

            let shared: Vec<Parameter> = item
                .parameters
                .iter()
                .map(|p| resolve_parameter(&document, p))
                .collect();

            let mut methods = HashMap::new();
            for (method, operation) in item.operations() {
                let mut parameters = shared.clone();
                for declared in &operation.parameters {
                    let declared = resolve_parameter(&document, declared);
                    parameters.retain(|existing| existing.key() != declared.key());
                    parameters.push(declared);
                }

                let responses: IndexMap<String, Response> = operation
                    .responses
                    .iter()
                    .map(|(status, response)| {
                        (status.clone(), resolve_response(&document, response))
                    })
                    .collect();

                methods.insert(
                    method.to_string(),
                    Endpoint {
                        path: template.clone(),
                        method: method.to_string(),
                        operation_id: operation.operation_id.clone(),
                        summary: operation.summary.clone(),
                        parameters,
                        responses: ResponseTable::new(responses),
                    },
                );
            }

            routes.push(Route { pattern, methods });
        }

        info!(
            paths = routes.len(),
            operations = routes.iter().map(|r| r.methods.len()).sum::<usize>(),
            "Indexed endpoints from OpenAPI spec"
        );

        self.routes = routes;
        self.diagnostics = diagnostics;
        self.document = Some(document);
    }

    /// The loaded specification, if the last load succeeded.
    pub fn specification(&self) -> Option<&OpenApiDocument> {
        self.document.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn path_count(&self) -> usize {
        self.routes.len()
    }

    /// Title, version, operations and diagnostics of the loaded document.
    pub fn summary(&self) -> SpecSummary {
        let info = self.document.as_ref().and_then(|doc| doc.info.as_ref());
        let operations: Vec<OperationSummary> = self
            .endpoints()
            .into_iter()
            .map(|endpoint| OperationSummary {
                method: endpoint.method.clone(),
                path: endpoint.path.clone(),
                operation_id: endpoint.operation_id.clone(),
            })
            .collect();
        SpecSummary {
            loaded: self.is_loaded(),
            title: info.and_then(|i| i.title.clone()),
            version: info.and_then(|i| i.version.clone()),
            endpoint_count: operations.len(),
            operations,
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// All operations in declaration order.
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        let mut endpoints = Vec::new();
        for route in &self.routes {
            let mut methods: Vec<&Endpoint> = route.methods.values().collect();
            methods.sort_by(|a, b| a.method.cmp(&b.method));
            endpoints.extend(methods);
        }
        endpoints
    }

    /// Resolve a request to an operation.
    ///
    /// The most specific matching template wins (first declared on equal
    /// score); the method is checked only against that template.
    pub fn resolve(&self, method: &str, path: &str) -> Option<&Endpoint> {
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if !route.pattern.matches(path) {
                continue;
            }
            let better = match best {
                Some(current) => route.pattern.specificity() > current.pattern.specificity(),
                None => true,
            };
            if better {
                best = Some(route);
            }
        }

        let route = match best {
            Some(route) => route,
            None => {
                debug!(method, path, "No path template matches");
                return None;
            }
        };

        let endpoint = route.methods.get(&method.to_ascii_uppercase());
        if endpoint.is_none() {
            debug!(
                method,
                path,
                template = route.pattern.template(),
                "Most specific template does not declare method"
            );
        }
        endpoint
    }

    /// Component schema table of the loaded specification.
    pub fn component_schemas(&self) -> Option<&IndexMap<String, Schema>> {
        self.document
            .as_ref()
            .and_then(|doc| doc.components.as_ref())
            .map(|components| &components.schemas)
    }

    /// Follow `$ref` chains through the component table. A cycle or a dangling
    /// reference returns the original node.
    pub fn resolve_schema_ref(&self, schema: &Schema) -> Schema {
        if schema.reference.is_none() {
            return schema.clone();
        }
        let components = match self.component_schemas() {
            Some(components) => components,
            None => return schema.clone(),
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = schema;
        while let Some(name) = current.reference_name() {
            if !visited.insert(name) {
                warn!(
                    reference = schema.reference.as_deref().unwrap_or_default(),
                    "Cyclic $ref detected; keeping reference node"
                );
                return schema.clone();
            }
            match components.get(name) {
                Some(target) => current = target,
                None => {
                    warn!(reference = name, "Unresolvable $ref; keeping reference node");
                    return schema.clone();
                }
            }
        }
        current.clone()
    }

    /// Schema of a response descriptor: `application/json`, then any `+json`
    /// media type, then the first declared one.
    pub fn response_schema<'a>(&self, response: &'a Response) -> Option<&'a Schema> {
        let content = &response.content;
        content
            .get("application/json")
            .or_else(|| {
                content
                    .iter()
                    .find(|(media, _)| media.to_ascii_lowercase().ends_with("+json"))
                    .map(|(_, media)| media)
            })
            .or_else(|| content.values().next())
            .and_then(|media| media.schema.as_ref())
    }
}

fn resolve_parameter(document: &OpenApiDocument, parameter: &Parameter) -> Parameter {
    let name = match parameter.reference.as_deref() {
        Some(reference) => reference.rsplit('/').next().unwrap_or(reference),
        None => return parameter.clone(),
    };
    document
        .components
        .as_ref()
        .and_then(|c| c.parameters.get(name))
        .filter(|target| target.reference.is_none())
        .cloned()
        .unwrap_or_else(|| parameter.clone())
}

fn resolve_response(document: &OpenApiDocument, response: &Response) -> Response {
    let components = match document.components.as_ref() {
        Some(components) => components,
        None => return response.clone(),
    };
    let mut visited = HashSet::new();
    let mut current = response;
    while let Some(reference) = current.reference.as_deref() {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        if !visited.insert(name) {
            return response.clone();
        }
        match components.responses.get(name) {
            Some(target) => current = target,
            None => return response.clone(),
        }
    }
    current.clone()
}
