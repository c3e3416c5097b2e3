//! Annotated OpenAPI description model
//!
//! Only the parts of an OpenAPI 3 document the action compiler reads are
//! modelled; every other key is ignored on load. Operations opt into the
//! catalog with `x-operationType`, parameters and schema properties carry their
//! concept identifier in `x-refersTo`.

use crate::error::{CompileError, CoreResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Extension key marking an operation as an invocable action
pub const OPERATION_TYPE_KEY: &str = "x-operationType";

/// Extension key carrying a concept identifier
pub const CONCEPT_KEY: &str = "x-refersTo";

/// Path item keys that hold operations
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Parsed description: servers, path items and the reusable components
#[derive(Debug, Clone, Default)]
pub struct ApiDescription {
    pub servers: Vec<Server>,
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
}

/// Operations declared under one path, keyed by lowercase method
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters shared by every operation of the path
    pub parameters: Vec<OrReference<Parameter>>,
    pub operations: IndexMap<String, Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub reference: String,
}

/// Either an inline object or a local `$ref`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrReference<T> {
    Reference(Reference),
    Item(T),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "x-operationType", default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<OrReference<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<OrReference<RequestBody>>,
    /// Left optional so a missing object surfaces as a compile error with context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, OrReference<Response>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "x-refersTo", default, skip_serializing_if = "Option::is_none")]
    pub refers_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<OrReference<Schema>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, OrReference<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<OrReference<Schema>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Required>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "x-refersTo", default, skip_serializing_if = "Option::is_none")]
    pub refers_to: Option<String>,
}

/// `required` is a boolean on annotated properties and a name list on objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Required {
    Flag(bool),
    Fields(Vec<String>),
}

impl Schema {
    /// `type: array`, or a type list that includes `array`
    pub fn is_array(&self) -> bool {
        match &self.schema_type {
            Some(Value::String(t)) => t == "array",
            Some(Value::Array(types)) => types.iter().any(|t| t == "array"),
            _ => false,
        }
    }

    /// Whether the property `name` of this object schema is required.
    pub fn is_property_required(&self, name: &str, property: &Schema) -> bool {
        if matches!(property.required, Some(Required::Flag(true))) {
            return true;
        }
        matches!(&self.required, Some(Required::Fields(fields)) if fields.iter().any(|f| f == name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, OrReference<Schema>>,
    #[serde(default)]
    pub parameters: IndexMap<String, OrReference<Parameter>>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, OrReference<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, OrReference<Response>>,
}

impl Components {
    pub fn schema<'a>(&'a self, item: &'a OrReference<Schema>) -> CoreResult<&'a Schema> {
        resolve(item, "schemas", &self.schemas)
    }

    pub fn parameter<'a>(&'a self, item: &'a OrReference<Parameter>) -> CoreResult<&'a Parameter> {
        resolve(item, "parameters", &self.parameters)
    }

    pub fn request_body<'a>(
        &'a self,
        item: &'a OrReference<RequestBody>,
    ) -> CoreResult<&'a RequestBody> {
        resolve(item, "requestBodies", &self.request_bodies)
    }

    pub fn response<'a>(&'a self, item: &'a OrReference<Response>) -> CoreResult<&'a Response> {
        resolve(item, "responses", &self.responses)
    }
}

/// Resolve a local `#/components/<section>/<name>` reference, one level deep.
fn resolve<'a, T>(
    item: &'a OrReference<T>,
    section: &str,
    table: &'a IndexMap<String, OrReference<T>>,
) -> CoreResult<&'a T> {
    let reference = match item {
        OrReference::Item(value) => return Ok(value),
        OrReference::Reference(reference) => &reference.reference,
    };

    let name = reference
        .strip_prefix("#/components/")
        .and_then(|rest| rest.strip_prefix(section))
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| CompileError::UnresolvedReference(reference.clone()))?;

    match table.get(name) {
        Some(OrReference::Item(value)) => Ok(value),
        Some(OrReference::Reference(_)) => Err(CompileError::NestedReference(reference.clone())),
        None => Err(CompileError::UnresolvedReference(reference.clone())),
    }
}

impl ApiDescription {
    /// Build the model from an already parsed JSON value
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(CompileError::malformed("description", "expected an object"));
        };

        let paths = match root.remove("paths") {
            Some(Value::Object(paths)) => paths,
            Some(_) => return Err(CompileError::malformed("paths", "expected an object")),
            None => return Err(CompileError::MissingPaths),
        };

        let servers = match root.remove("servers") {
            Some(value) => section(value, "servers")?,
            None => Vec::new(),
        };

        let components = match root.remove("components") {
            Some(value) => section(value, "components")?,
            None => Components::default(),
        };

        let mut parsed = IndexMap::with_capacity(paths.len());
        for (path, item) in paths {
            let item = PathItem::from_value(&path, item)?;
            parsed.insert(path, item);
        }

        Ok(Self {
            servers,
            paths: parsed,
            components,
        })
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| CompileError::parse(format!("JSON parse error: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| yaml_error(None, &e))?;
        Self::from_value(value)
    }

    /// Load a description file; `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CompileError::Io(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let value: Value = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| yaml_error(Some(path), &e))?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                CompileError::parse(format!(
                    "JSON parse error at {}:{} in {}: {}",
                    e.line(),
                    e.column(),
                    path.display(),
                    e
                ))
            })?
        };

        Self::from_value(value)
    }

    /// URL of the first declared server, if any
    pub fn default_server(&self) -> Option<&str> {
        self.servers.first().map(|server| server.url.as_str())
    }
}

impl PathItem {
    fn from_value(path: &str, value: Value) -> CoreResult<Self> {
        let Value::Object(entries) = value else {
            return Err(CompileError::malformed(path, "expected a path item object"));
        };

        let mut item = PathItem::default();
        for (key, entry) in entries {
            if key == "parameters" {
                item.parameters = section(entry, &format!("{} parameters", path))?;
                continue;
            }

            let method = key.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&method.as_str()) {
                continue;
            }

            let operation = section(entry, &format!("{} {}", method.to_uppercase(), path))?;
            item.operations.insert(method, operation);
        }

        Ok(item)
    }
}

fn section<T: DeserializeOwned>(value: Value, location: &str) -> CoreResult<T> {
    serde_json::from_value(value).map_err(|e| CompileError::malformed(location, e.to_string()))
}

fn yaml_error(path: Option<&Path>, err: &serde_yaml::Error) -> CompileError {
    let source = path
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default();
    match err.location() {
        Some(loc) => CompileError::parse(format!(
            "YAML parse error at {}:{}{}: {}",
            loc.line(),
            loc.column(),
            source,
            err
        )),
        None => CompileError::parse(format!("YAML parse error{}: {}", source, err)),
    }
}
