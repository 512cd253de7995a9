//! Error types for the mapping layer.
//!
//! # Design
//! Misuse of the dynamic member protocol is split into two variants:
//! `UnknownMember` when no strategy recognises the name at all, and
//! `InvalidArgument` when a strategy recognises the name but the call had the
//! wrong number of arguments. Validation errors returned by the server are not
//! represented here; they are folded into a model's `ValidationErrors`.

use thiserror::Error;

/// Errors returned by models, classes, relations and the HTTP seam.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No association, attribute, predicate or setter matched `name`.
    #[error("undefined member `{name}` for {class}")]
    UnknownMember { class: String, name: String },

    /// `name` matched a known member shape but was called with the wrong arity.
    #[error("wrong number of arguments for `{name}` on {class} (given {given}, expected {expected})")]
    InvalidArgument {
        class: String,
        name: String,
        expected: usize,
        given: usize,
    },

    /// A required placeholder in a path template had no value.
    #[error("missing required variables: {} in {template}. Mark optional variables with parens eg: (:param)", .missing.join(", "))]
    InvalidPath { template: String, missing: Vec<String> },

    /// A lookup by primary key produced no record.
    #[error("{class} not found (id: {id})")]
    NotFound { class: String, id: String },

    #[error("{class} has no association named `{name}`")]
    UnknownAssociation { class: String, name: String },

    #[error("no model class named `{0}` in schema")]
    UnknownClass(String),

    /// An association target was looked up after its schema was dropped.
    #[error("schema was dropped before association could be resolved")]
    SchemaDropped,

    /// The transport failed before a response was produced.
    #[error("transport failed: {0}")]
    Transport(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
