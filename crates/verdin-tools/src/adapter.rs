//! Adaptation of raw tool definitions into model-facing function schemas.
//!
//! A tool definition is an OpenAPI-style document: `info.title`,
//! `info.description`, and `paths` mapping URL paths to HTTP methods to
//! operations. Each operation becomes one callable `FunctionSchema`, with
//! query/path parameters and the JSON request body merged into a single
//! object parameter schema.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use verdin_core::error::{Result, VerdinError};
use verdin_core::types::{FunctionSchema, OperationRoute};

use crate::descriptor::ToolDescriptor;

/// HTTP methods recognized as operations, in routing order.
const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDocument {
    #[serde(default)]
    pub info: ApiInfo,
    #[serde(default)]
    paths: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Operation {
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(rename = "requestBody")]
    request_body: Option<RequestBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct Parameter {
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RequestBody {
    #[serde(default)]
    content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Deserialize)]
struct MediaType {
    #[serde(default)]
    schema: Option<serde_yaml::Value>,
}

/// Parse a raw definition document.
pub fn parse_document(raw: &str) -> Result<ApiDocument> {
    serde_yaml::from_str(raw).map_err(|e| VerdinError::Definition(e.to_string()))
}

impl ApiDocument {
    /// All operations in deterministic order: paths sorted lexically,
    /// methods in `METHODS` order.
    fn operations(&self) -> Result<Vec<(String, String, Operation)>> {
        let mut out = Vec::new();
        for (path, item) in &self.paths {
            for method in METHODS {
                if let Some(value) = item.get(method) {
                    let op: Operation = serde_yaml::from_value(value.clone())
                        .map_err(|e| VerdinError::Definition(e.to_string()))?;
                    out.push((path.clone(), method.to_string(), op));
                }
            }
        }
        Ok(out)
    }
}

fn yaml_to_json(value: &serde_yaml::Value) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| VerdinError::Definition(e.to_string()))
}

/// Merge an operation's parameters and request body into one JSON object
/// schema the model can fill in.
fn parameter_schema(op: &Operation) -> Result<serde_json::Value> {
    let mut properties = serde_json::Map::new();
    let mut required: Vec<String> = Vec::new();

    // Request body schema first (prefer application/json)
    if let Some(body) = &op.request_body {
        let media = body
            .content
            .get("application/json")
            .or_else(|| body.content.values().next());
        if let Some(schema) = media.and_then(|m| m.schema.as_ref()) {
            let schema = yaml_to_json(schema)?;
            if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
                properties.extend(props.clone());
            }
            if let Some(req) = schema.get("required").and_then(|r| r.as_array()) {
                required.extend(req.iter().filter_map(|v| v.as_str().map(String::from)));
            }
        }
    }

    // Query/path parameters overlay the body properties
    for param in &op.parameters {
        let mut schema = match &param.schema {
            Some(value) => yaml_to_json(value)?,
            None => json!({ "type": "string" }),
        };
        if let (Some(obj), Some(desc)) = (schema.as_object_mut(), &param.description) {
            obj.entry("description".to_string())
                .or_insert_with(|| json!(desc));
        }
        properties.insert(param.name.clone(), schema);
        if param.required && !required.iter().any(|r| r == &param.name) {
            required.push(param.name.clone());
        }
    }

    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

/// A short, stable prefix for disambiguating colliding operation names:
/// the first segment of the tool's UUID.
fn short_id(tool_id: &str) -> &str {
    tool_id.split('-').next().unwrap_or(tool_id)
}

/// Convert descriptors into the callable function schemas offered to the
/// model.
///
/// Disabled descriptors are excluded. A descriptor whose definition fails to
/// parse is skipped and reported; it never aborts adaptation of the others.
/// Output order is deterministic for a given input: descriptors in slice
/// order, operations path-then-method.
pub fn to_callable_tools(descriptors: &[ToolDescriptor]) -> Vec<FunctionSchema> {
    let mut schemas: Vec<FunctionSchema> = Vec::new();

    for descriptor in descriptors.iter().filter(|d| d.enabled) {
        let adapted = adapt_descriptor(descriptor);
        match adapted {
            Ok(mut tool_schemas) => schemas.append(&mut tool_schemas),
            Err(e) => {
                warn!(tool_id = %descriptor.id, error = %e, "Skipping malformed tool definition");
            }
        }
    }

    disambiguate(&mut schemas);
    schemas
}

fn adapt_descriptor(descriptor: &ToolDescriptor) -> Result<Vec<FunctionSchema>> {
    let doc = parse_document(&descriptor.definition)?;
    let mut out = Vec::new();

    for (path, method, op) in doc.operations()? {
        let Some(name) = op.operation_id.clone() else {
            warn!(
                tool_id = %descriptor.id,
                %path,
                %method,
                "Operation without operationId, skipping"
            );
            continue;
        };

        let description = op
            .description
            .clone()
            .or_else(|| op.summary.clone())
            .or_else(|| doc.info.description.clone())
            .unwrap_or_else(|| doc.info.title.clone());

        out.push(FunctionSchema {
            name: name.clone(),
            description,
            parameters: parameter_schema(&op)?,
            route: OperationRoute {
                tool_id: descriptor.id.clone(),
                operation: name,
                method,
                path,
            },
        });
    }

    Ok(out)
}

/// Prefix colliding operation names with the owning tool's short id so the
/// model can address an exact operation.
fn disambiguate(schemas: &mut [FunctionSchema]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for schema in schemas.iter() {
        *counts.entry(schema.name.as_str()).or_default() += 1;
    }
    let colliding: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_string())
        .collect();

    for schema in schemas.iter_mut() {
        if colliding.iter().any(|c| c == &schema.name) {
            schema.name = format!("{}_{}", short_id(&schema.route.tool_id), schema.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_DOC: &str = r#"
openapi: 3.0.0
info:
  title: Search
  description: Web search
paths:
  /search:
    get:
      operationId: search_query
      summary: Search the web
      parameters:
        - name: q
          in: query
          required: true
          description: The query string
          schema:
            type: string
        - name: limit
          in: query
          schema:
            type: integer
"#;

    const BROWSER_DOC: &str = r#"
openapi: 3.0.0
info:
  title: Browser
paths:
  /navigate:
    post:
      operationId: navigate
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                url:
                  type: string
              required: [url]
  /click:
    post:
      operationId: click
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                selector:
                  type: string
"#;

    fn descriptor(id: &str, doc: &str) -> ToolDescriptor {
        ToolDescriptor::new(id, doc)
    }

    #[test]
    fn test_one_schema_per_operation() {
        let tools = to_callable_tools(&[
            descriptor("aaaa-1", SEARCH_DOC),
            descriptor("bbbb-2", BROWSER_DOC),
        ]);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search_query", "click", "navigate"]);
    }

    #[test]
    fn test_parameters_merged_into_object_schema() {
        let tools = to_callable_tools(&[descriptor("aaaa-1", SEARCH_DOC)]);
        let params = &tools[0].parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["q"]["type"], "string");
        assert_eq!(params["properties"]["q"]["description"], "The query string");
        assert_eq!(params["properties"]["limit"]["type"], "integer");
        assert_eq!(params["required"], serde_json::json!(["q"]));
    }

    #[test]
    fn test_request_body_schema() {
        let tools = to_callable_tools(&[descriptor("bbbb-2", BROWSER_DOC)]);
        let navigate = tools.iter().find(|t| t.name == "navigate").unwrap();
        assert_eq!(navigate.parameters["properties"]["url"]["type"], "string");
        assert_eq!(navigate.parameters["required"], serde_json::json!(["url"]));
        assert_eq!(navigate.route.method, "post");
        assert_eq!(navigate.route.path, "/navigate");
    }

    #[test]
    fn test_disabled_descriptor_excluded() {
        let mut disabled = descriptor("aaaa-1", SEARCH_DOC);
        disabled.enabled = false;
        let tools = to_callable_tools(&[disabled, descriptor("bbbb-2", BROWSER_DOC)]);
        assert!(tools.iter().all(|t| t.route.tool_id == "bbbb-2"));
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn test_malformed_definition_skipped_not_fatal() {
        let tools = to_callable_tools(&[
            descriptor("broken", ": not [ valid yaml"),
            descriptor("aaaa-1", SEARCH_DOC),
        ]);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search_query");
    }

    #[test]
    fn test_collision_disambiguated_by_tool_prefix() {
        let doc_a = r#"
info:
  title: A
paths:
  /run:
    post:
      operationId: run
"#;
        let doc_b = r#"
info:
  title: B
paths:
  /run:
    post:
      operationId: run
"#;
        let tools = to_callable_tools(&[
            descriptor("11111111-aaaa", doc_a),
            descriptor("22222222-bbbb", doc_b),
        ]);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["11111111_run", "22222222_run"]);
        // The dispatch key is untouched by disambiguation
        assert!(tools.iter().all(|t| t.route.operation == "run"));
    }

    #[test]
    fn test_deterministic_ordering() {
        let input = [
            descriptor("aaaa-1", SEARCH_DOC),
            descriptor("bbbb-2", BROWSER_DOC),
        ];
        let first = to_callable_tools(&input);
        let second = to_callable_tools(&input);
        let names =
            |tools: &[FunctionSchema]| tools.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_operation_without_id_skipped() {
        let doc = r#"
info:
  title: Partial
paths:
  /a:
    get:
      summary: no id here
  /b:
    get:
      operationId: b_get
"#;
        let tools = to_callable_tools(&[descriptor("cccc-3", doc)]);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "b_get");
    }
}
