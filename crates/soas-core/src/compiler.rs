//! Action compiler
//!
//! Walks an annotated description once and produces an [`ActionCatalog`].
//! Compilation fails fast: the first malformed operation aborts it and no
//! partial catalog is returned.

use crate::action::{
    Action, BindingLocation, BodyContract, BodyShape, ConceptId, Endpoint, InputBinding,
    OutputBinding, Route,
};
use crate::catalog::ActionCatalog;
use crate::content_type::{is_json, rank_content_types};
use crate::description::{
    ApiDescription, MediaType, Operation, OrReference, Parameter, PathItem, Response, Schema,
};
use crate::error::{CompileError, CoreResult};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Only this response is read for output bindings and shape
pub const SUCCESS_STATUS: &str = "200";

/// Compile `description` into an immutable catalog.
pub fn compile(description: &ApiDescription) -> CoreResult<ActionCatalog> {
    ActionCompiler::new(description).compile()
}

pub struct ActionCompiler<'a> {
    description: &'a ApiDescription,
}

impl<'a> ActionCompiler<'a> {
    pub fn new(description: &'a ApiDescription) -> Self {
        Self { description }
    }

    pub fn compile(&self) -> CoreResult<ActionCatalog> {
        let mut catalog = ActionCatalog {
            servers: self.description.servers.clone(),
            ..Default::default()
        };

        for (path, item) in &self.description.paths {
            for (method, operation) in &item.operations {
                let responses = operation.responses.as_ref().ok_or_else(|| {
                    CompileError::MissingResponses {
                        path: path.clone(),
                        method: method.clone(),
                    }
                })?;

                catalog.endpoints.push(Endpoint {
                    path: path.clone(),
                    method: method.clone(),
                    operation_id: operation.operation_id.clone(),
                    summary: operation.summary.clone(),
                    operation_type: operation.operation_type.clone(),
                });

                let Some(kind) = &operation.operation_type else {
                    continue;
                };

                let action = self.compile_operation(path, method, item, operation, responses, kind)?;
                if !action.usable {
                    debug!(action_id = %action.id, "required request body has no JSON schema");
                }

                let id = action.id.clone();
                if catalog.actions.insert(id.clone(), action).is_some() {
                    warn!(action_id = %id, "duplicate action id, later declaration wins");
                }
            }
        }

        debug!(
            endpoints = catalog.endpoints.len(),
            actions = catalog.actions.len(),
            "compiled action catalog"
        );
        Ok(catalog)
    }

    fn compile_operation(
        &self,
        path: &str,
        method: &str,
        item: &'a PathItem,
        operation: &'a Operation,
        responses: &'a IndexMap<String, OrReference<Response>>,
        kind: &str,
    ) -> CoreResult<Action> {
        let id = operation
            .operation_id
            .clone()
            .unwrap_or_else(|| generate_action_id(method, path));
        let location = format!("{} {}", method.to_uppercase(), path);

        let mut input_bindings = IndexMap::new();
        for parameter in self.parameters(item, operation)? {
            let binding_location = parameter_location(parameter)?;
            let Some(concept) = &parameter.refers_to else {
                continue;
            };
            input_bindings.insert(
                concept.clone(),
                InputBinding {
                    wire_name: parameter.name.clone(),
                    location: binding_location,
                    required: parameter.required,
                    description: parameter.description.clone(),
                },
            );
        }

        let (input_body, usable) = self.input_body(operation, &location, &mut input_bindings)?;

        let mut output_bindings = IndexMap::new();
        let output_body = match responses.get(SUCCESS_STATUS) {
            Some(response) => {
                let response = self.description.components.response(response)?;
                Some(self.output_body(response, &location, &mut output_bindings)?)
            }
            None => None,
        };

        Ok(Action {
            id,
            route: Route {
                path: path.to_string(),
                method: method.to_string(),
            },
            input_bindings,
            output_bindings,
            input_body,
            output_body,
            usable,
            summary: operation.summary.clone(),
            kind: kind.to_string(),
        })
    }

    /// Path-level parameters followed by the operation's; the operation wins on
    /// the same `(name, in)` pair.
    fn parameters(
        &self,
        item: &'a PathItem,
        operation: &'a Operation,
    ) -> CoreResult<Vec<&'a Parameter>> {
        let components = &self.description.components;
        let mut merged: Vec<&'a Parameter> = Vec::new();
        for reference in item.parameters.iter().chain(&operation.parameters) {
            let parameter = components.parameter(reference)?;
            let existing = merged
                .iter_mut()
                .find(|p| p.name == parameter.name && p.location == parameter.location);
            match existing {
                Some(slot) => *slot = parameter,
                None => merged.push(parameter),
            }
        }
        Ok(merged)
    }

    fn input_body(
        &self,
        operation: &'a Operation,
        location: &str,
        bindings: &mut IndexMap<ConceptId, InputBinding>,
    ) -> CoreResult<(Option<BodyContract>, bool)> {
        let Some(reference) = &operation.request_body else {
            return Ok((None, true));
        };
        let body = self.description.components.request_body(reference)?;

        let shape = self.body_shape(&body.content, location)?;
        if let Some(shape) = &shape {
            let record = shape.record_schema();
            for (name, property) in &record.properties {
                let property = self.description.components.schema(property)?;
                let Some(concept) = &property.refers_to else {
                    continue;
                };
                bindings.insert(
                    concept.clone(),
                    InputBinding {
                        wire_name: name.clone(),
                        location: BindingLocation::Body,
                        required: body.required && record.is_property_required(name, property),
                        description: property.description.clone(),
                    },
                );
            }
        }

        let usable = shape.is_some() || !body.required;
        let contract = BodyContract {
            shape,
            content_types: rank_content_types(body.content.keys().cloned()),
        };
        Ok((Some(contract), usable))
    }

    fn output_body(
        &self,
        response: &'a Response,
        location: &str,
        bindings: &mut IndexMap<ConceptId, OutputBinding>,
    ) -> CoreResult<BodyContract> {
        let shape = self.body_shape(&response.content, location)?;
        if let Some(shape) = &shape {
            let record = shape.record_schema();
            for (name, property) in &record.properties {
                let property = self.description.components.schema(property)?;
                let Some(concept) = &property.refers_to else {
                    continue;
                };
                bindings.insert(
                    concept.clone(),
                    OutputBinding {
                        wire_name: name.clone(),
                        required: record.is_property_required(name, property),
                        description: property.description.clone(),
                    },
                );
            }
        }

        Ok(BodyContract {
            shape,
            content_types: rank_content_types(response.content.keys().cloned()),
        })
    }

    /// Shape of the JSON schema declared for `content`, if any
    fn body_shape(
        &self,
        content: &'a IndexMap<String, MediaType>,
        location: &str,
    ) -> CoreResult<Option<BodyShape>> {
        let Some(schema) = self.json_schema(content)? else {
            return Ok(None);
        };

        if !schema.is_array() {
            return Ok(Some(BodyShape::Single(schema.clone())));
        }

        let items = schema
            .items
            .as_deref()
            .ok_or_else(|| CompileError::MissingItems(location.to_string()))?;
        let items = self.description.components.schema(items)?;
        Ok(Some(BodyShape::Collection(items.clone())))
    }

    fn json_schema(&self, content: &'a IndexMap<String, MediaType>) -> CoreResult<Option<&'a Schema>> {
        content
            .iter()
            .filter(|(content_type, _)| is_json(content_type))
            .find_map(|(_, media)| media.schema.as_ref())
            .map(|schema| self.description.components.schema(schema))
            .transpose()
    }
}

/// Identifier for an operation without `operationId`, e.g. `post/coords`
pub fn generate_action_id(method: &str, path: &str) -> String {
    format!("{}{}", method.to_lowercase(), path)
}

fn parameter_location(parameter: &Parameter) -> CoreResult<BindingLocation> {
    let invalid = || CompileError::InvalidParameterLocation {
        name: parameter.name.clone(),
        location: parameter.location.clone(),
    };
    match parameter.location.parse::<BindingLocation>() {
        Ok(BindingLocation::Body) | Err(_) => Err(invalid()),
        Ok(location) => Ok(location),
    }
}
