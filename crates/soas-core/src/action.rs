//! Compiled actions and their concept bindings

use crate::description::Schema;
use crate::error::CompileError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action identifier: the operation id, or `method + path` when absent
pub type ActionId = String;

/// Vendor-neutral concept identifier, typically a URI
pub type ConceptId = String;

/// HTTP route of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    /// Lowercase HTTP method as declared in the description
    pub method: String,
}

/// Where an input binding lives in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingLocation {
    Query,
    Path,
    Header,
    Cookie,
    Body,
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindingLocation::Query => write!(f, "query"),
            BindingLocation::Path => write!(f, "path"),
            BindingLocation::Header => write!(f, "header"),
            BindingLocation::Cookie => write!(f, "cookie"),
            BindingLocation::Body => write!(f, "body"),
        }
    }
}

impl FromStr for BindingLocation {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(BindingLocation::Query),
            "path" => Ok(BindingLocation::Path),
            "header" => Ok(BindingLocation::Header),
            "cookie" => Ok(BindingLocation::Cookie),
            "body" => Ok(BindingLocation::Body),
            other => Err(CompileError::InvalidParameterLocation {
                name: String::new(),
                location: other.to_string(),
            }),
        }
    }
}

/// Concept to wire mapping on the request side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    pub wire_name: String,
    pub location: BindingLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Wire to concept mapping on the response side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBinding {
    pub wire_name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Shape of a JSON body, decided once when the action is compiled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "schema", rename_all = "lowercase")]
pub enum BodyShape {
    /// One record
    Single(Schema),
    /// A stream of records, each matching the item schema
    Collection(Schema),
}

impl BodyShape {
    pub fn is_collection(&self) -> bool {
        matches!(self, BodyShape::Collection(_))
    }

    /// Schema of one record
    pub fn record_schema(&self) -> &Schema {
        match self {
            BodyShape::Single(schema) | BodyShape::Collection(schema) => schema,
        }
    }
}

/// Request or response body as seen by an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyContract {
    /// `None` when no JSON schema is declared
    pub shape: Option<BodyShape>,
    /// Declared content types, highest priority first
    pub content_types: Vec<String>,
}

/// One (path, method) pair of the description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `x-operationType` value, when the operation carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
}

/// A compiled, invocable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub route: Route,
    pub input_bindings: IndexMap<ConceptId, InputBinding>,
    pub output_bindings: IndexMap<ConceptId, OutputBinding>,
    pub input_body: Option<BodyContract>,
    pub output_body: Option<BodyContract>,
    /// False when a required request body has no JSON schema
    pub usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `x-operationType` value
    pub kind: String,
}

impl Action {
    pub fn has_request_body(&self) -> bool {
        self.input_body.is_some()
    }

    pub fn input_is_collection(&self) -> bool {
        is_collection(&self.input_body)
    }

    pub fn output_is_collection(&self) -> bool {
        is_collection(&self.output_body)
    }

    pub fn input_content_types(&self) -> &[String] {
        content_types(&self.input_body)
    }

    pub fn output_content_types(&self) -> &[String] {
        content_types(&self.output_body)
    }

    /// Input bindings that target the request body, in declaration order
    pub fn body_bindings(&self) -> impl Iterator<Item = (&ConceptId, &InputBinding)> {
        self.input_bindings
            .iter()
            .filter(|(_, binding)| binding.location == BindingLocation::Body)
    }
}

fn is_collection(body: &Option<BodyContract>) -> bool {
    body.as_ref()
        .and_then(|contract| contract.shape.as_ref())
        .map(BodyShape::is_collection)
        .unwrap_or(false)
}

fn content_types(body: &Option<BodyContract>) -> &[String] {
    body.as_ref()
        .map(|contract| contract.content_types.as_slice())
        .unwrap_or(&[])
}
