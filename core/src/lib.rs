//! Synchronous REST resource mapping.
//!
//! # Overview
//! Model classes describe remote resources: a path template such as
//! `/users/(:id)`, a primary key, declared attributes, coercions and
//! associations. Model instances hold an attribute bag, resolve their own
//! request path from it, and translate get/post/put/patch/delete into HTTP
//! requests whose responses are folded back into the instance.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`);
//!   the `Transport` trait is the only I/O seam. `UreqTransport` talks to a
//!   real server, `MockTransport` answers from a queue in tests.
//! - Every response becomes an `Envelope` of `data`, `errors` and
//!   `metadata`. Server validation errors are data on the model, never `Err`.
//! - Dynamic member access (`Model::send`) is an explicit chain of resolution
//!   strategies that distinguishes an unknown member from a known member
//!   called with the wrong number of arguments.
//! - Configuration is an explicit `Config` → `Connection` → `Schema` chain;
//!   there is no global state.
//!
//! ```no_run
//! use remodel_core::{params_from, Config, Connection, ModelClass, Schema, Target};
//! use serde_json::json;
//!
//! let schema = Schema::builder(Connection::ureq(Config::new("http://localhost:3000")))
//!     .model(ModelClass::builder("User").attributes(["name"]).has_many("posts", "Post"))
//!     .model(ModelClass::builder("Post").belongs_to("user", "User"))
//!     .build();
//!
//! let users = schema.class("User")?;
//! let mut user = users.create(params_from(json!({"name": "Ada"})))?;
//! user.patch(&Target::Own, &params_from(json!({"name": "Ada L."})))?;
//! if !user.errors().is_empty() {
//!     eprintln!("{:?}", user.errors());
//! }
//! # Ok::<(), remodel_core::ModelError>(())
//! ```

pub mod associations;
pub mod attributes;
pub mod class;
pub mod collection;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod mock;
pub mod model;
pub mod naming;
pub mod path;
pub mod relation;
pub mod result;
pub mod schema;
pub mod transport;
pub mod validation;

pub use associations::{Association, AssociationBuilder, AssociationKind, Related};
pub use attributes::{is_truthy, params_from, Attributes, Coercion, Params};
pub use class::{Loaded, ModelClass, ModelClassBuilder};
pub use collection::Collection;
pub use config::Config;
pub use connection::Connection;
pub use dispatch::{Member, Resolution, Resolved};
pub use error::ModelError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mock::MockTransport;
pub use model::{Model, Target};
pub use naming::ModelName;
pub use path::Path;
pub use relation::Relation;
pub use result::Envelope;
pub use schema::{Schema, SchemaBuilder};
pub use transport::{Transport, UreqTransport};
pub use validation::{ErrorDetail, Message, ValidationErrors};
