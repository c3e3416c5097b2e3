//! Concept translation between caller records and wire records
//!
//! Translators are built per call from an action's bindings and hold them as
//! ordered `(concept, wire name)` lists. Values are moved, never cloned, and
//! keys without a binding are dropped.

use crate::action::{Action, BindingLocation, ConceptId};
use serde_json::{Map, Value};

/// A JSON object keyed by concept identifiers or by wire names
pub type Record = Map<String, Value>;

/// Concept-keyed record to wire-keyed request record
#[derive(Debug, Clone)]
pub struct InputTranslator {
    body: Vec<(ConceptId, String)>,
    deferred: Vec<(ConceptId, String)>,
}

impl InputTranslator {
    pub fn for_action(action: &Action) -> Self {
        let mut body = Vec::new();
        let mut deferred = Vec::new();
        for (concept, binding) in &action.input_bindings {
            let pair = (concept.clone(), binding.wire_name.clone());
            if binding.location == BindingLocation::Body {
                body.push(pair);
            } else {
                deferred.push(pair);
            }
        }
        Self { body, deferred }
    }

    /// Map body-bound concepts to their wire names. Everything else is dropped.
    pub fn translate(&self, mut record: Record) -> Record {
        let mut wire = Record::new();
        for (concept, wire_name) in &self.body {
            if let Some(value) = record.remove(concept) {
                wire.insert(wire_name.clone(), value);
            }
        }
        wire
    }

    /// Every body wire name in binding order, each once
    pub fn wire_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.body.len());
        for (_, wire_name) in &self.body {
            if !names.contains(wire_name) {
                names.push(wire_name.clone());
            }
        }
        names
    }

    /// Concepts present in `record` that are bound outside the body.
    ///
    /// These are not applied to the request.
    pub fn deferred<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.deferred
            .iter()
            .filter(|(concept, _)| record.contains_key(concept))
            .map(|(concept, _)| concept.as_str())
            .collect()
    }

    /// Body concepts the action binds that `record` lacks
    pub fn missing_concepts<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.body
            .iter()
            .filter(|(concept, _)| !record.contains_key(concept))
            .map(|(concept, _)| concept.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Wire-keyed response record to concept-keyed record
#[derive(Debug, Clone)]
pub struct OutputTranslator {
    bindings: Vec<(String, ConceptId)>,
}

impl OutputTranslator {
    pub fn for_action(action: &Action) -> Self {
        let bindings = action
            .output_bindings
            .iter()
            .map(|(concept, binding)| (binding.wire_name.clone(), concept.clone()))
            .collect();
        Self { bindings }
    }

    pub fn translate(&self, mut record: Record) -> Record {
        let mut concepts = Record::new();
        for (wire_name, concept) in &self.bindings {
            if let Some(value) = record.remove(wire_name) {
                concepts.insert(concept.clone(), value);
            }
        }
        concepts
    }

    /// Concepts whose wire field is absent from `record`
    pub fn missing_concepts<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.bindings
            .iter()
            .filter(|(wire_name, _)| !record.contains_key(wire_name))
            .map(|(_, concept)| concept.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{InputBinding, OutputBinding, Route};
    use indexmap::IndexMap;
    use serde_json::json;

    const LAT: &str = "http://schema.org/latitude";
    const LON: &str = "http://schema.org/longitude";
    const ADDRESS: &str = "http://schema.org/address";

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn action() -> Action {
        let mut input_bindings = IndexMap::new();
        input_bindings.insert(
            ADDRESS.to_string(),
            InputBinding {
                wire_name: "q".to_string(),
                location: BindingLocation::Query,
                required: true,
                description: None,
            },
        );
        for (concept, wire) in [(LAT, "lat"), (LON, "lon")] {
            input_bindings.insert(
                concept.to_string(),
                InputBinding {
                    wire_name: wire.to_string(),
                    location: BindingLocation::Body,
                    required: false,
                    description: None,
                },
            );
        }

        let mut output_bindings = IndexMap::new();
        for (concept, wire) in [(LAT, "lat"), (LON, "lon")] {
            output_bindings.insert(
                concept.to_string(),
                OutputBinding {
                    wire_name: wire.to_string(),
                    required: false,
                    description: None,
                },
            );
        }

        Action {
            id: "echo".to_string(),
            route: Route {
                path: "/echo".to_string(),
                method: "post".to_string(),
            },
            input_bindings,
            output_bindings,
            input_body: None,
            output_body: None,
            usable: true,
            summary: None,
            kind: "echo".to_string(),
        }
    }

    #[test]
    fn test_input_keeps_only_body_bindings() {
        let translator = InputTranslator::for_action(&action());
        let input = record(json!({LAT: 48.1, ADDRESS: "Paris", "unbound": 1}));

        let deferred = translator.deferred(&input);
        let wire = translator.translate(input);

        assert_eq!(wire, record(json!({"lat": 48.1})));
        assert_eq!(deferred, vec![ADDRESS]);
    }

    #[test]
    fn test_output_drops_unmapped_fields() {
        let translator = OutputTranslator::for_action(&action());
        let wire = record(json!({"lat": 1.0, "lon": 2.0, "matchLevel": "street"}));

        let concepts = translator.translate(wire);
        assert_eq!(concepts, record(json!({LAT: 1.0, LON: 2.0})));
    }

    #[test]
    fn test_round_trip() {
        let action = action();
        let input = InputTranslator::for_action(&action);
        let output = OutputTranslator::for_action(&action);

        let original = record(json!({LAT: 45.5, LON: -73.6}));
        assert_eq!(output.translate(input.translate(original.clone())), original);
    }

    #[test]
    fn test_missing_concepts() {
        let action = action();
        let input = InputTranslator::for_action(&action);
        let output = OutputTranslator::for_action(&action);

        assert_eq!(input.missing_concepts(&record(json!({LAT: 1}))), vec![LON]);
        assert_eq!(output.missing_concepts(&record(json!({"lon": 1}))), vec![LAT]);
    }

    #[test]
    fn test_wire_names_cover_body_bindings_once() {
        let mut action = action();
        action.input_bindings.insert(
            "http://schema.org/geo".to_string(),
            InputBinding {
                wire_name: "lat".to_string(),
                location: BindingLocation::Body,
                required: false,
                description: None,
            },
        );

        let translator = InputTranslator::for_action(&action);
        assert_eq!(translator.wire_names(), vec!["lat", "lon"]);
    }
}
