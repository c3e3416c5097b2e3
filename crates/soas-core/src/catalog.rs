//! Immutable catalog produced by the compiler

use crate::action::{Action, ActionId, Endpoint};
use crate::description::{ApiDescription, Server};
use crate::error::CoreResult;
use indexmap::IndexMap;

/// Endpoints and actions of one description
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    pub(crate) endpoints: Vec<Endpoint>,
    pub(crate) actions: IndexMap<ActionId, Action>,
    pub(crate) servers: Vec<Server>,
}

impl ActionCatalog {
    /// Compile a description into a catalog
    pub fn from_description(description: &ApiDescription) -> CoreResult<Self> {
        crate::compiler::compile(description)
    }

    /// Every (path, method) pair, in description order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// URL of the first declared server
    pub fn default_server(&self) -> Option<&str> {
        self.servers.first().map(|server| server.url.as_str())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
