//! SOAS core: annotated OpenAPI model, action compiler and concept translators
//!
//! An OpenAPI description whose operations carry `x-operationType` and whose
//! parameters and body properties carry `x-refersTo` is compiled into an
//! [`ActionCatalog`]. Each [`Action`] maps concept identifiers to the wire
//! names of one operation.

pub mod action;
pub mod catalog;
pub mod compiler;
pub mod content_type;
pub mod description;
pub mod error;
pub mod translate;

pub use action::{
    Action, ActionId, BindingLocation, BodyContract, BodyShape, ConceptId, Endpoint,
    InputBinding, OutputBinding, Route,
};
pub use catalog::ActionCatalog;
pub use compiler::{compile, ActionCompiler};
pub use content_type::rank_content_types;
pub use description::{ApiDescription, CONCEPT_KEY, OPERATION_TYPE_KEY};
pub use error::{CompileError, CoreResult};
pub use translate::{InputTranslator, OutputTranslator, Record};
