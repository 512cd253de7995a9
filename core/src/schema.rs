//! The registry that turns class declarations into usable model classes.
//!
//! # Design
//! A `Schema` owns the shared `Connection` and every `ModelClass` built from
//! it. Classes find their association targets by name through a weak
//! back-reference to the schema, which lets two classes refer to each other
//! (a user has many posts, a post belongs to a user) without a reference
//! cycle. Keep the `Schema` alive for as long as associations are used.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::class::{ModelClass, ModelClassBuilder};
use crate::connection::Connection;
use crate::error::ModelError;

pub(crate) struct SchemaInner {
    connection: Arc<Connection>,
    classes: BTreeMap<String, ModelClass>,
}

#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    pub fn builder(connection: Connection) -> SchemaBuilder {
        SchemaBuilder {
            connection: Arc::new(connection),
            models: Vec::new(),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SchemaInner>) -> Self {
        Self { inner }
    }

    pub fn class(&self, name: &str) -> Result<ModelClass, ModelError> {
        self.inner
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownClass(name.to_string()))
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.inner.classes.keys().map(String::as_str)
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }
}

pub struct SchemaBuilder {
    connection: Arc<Connection>,
    models: Vec<ModelClassBuilder>,
}

impl SchemaBuilder {
    pub fn model(mut self, builder: ModelClassBuilder) -> Self {
        self.models.push(builder);
        self
    }

    pub fn build(self) -> Schema {
        let SchemaBuilder { connection, models } = self;
        let inner = Arc::new_cyclic(|schema: &Weak<SchemaInner>| {
            let mut classes = BTreeMap::new();
            for builder in models {
                let class = builder.build(Arc::clone(&connection), schema.clone());
                if classes.contains_key(class.name()) {
                    tracing::warn!(class = class.name(), "model declared twice, keeping the last");
                }
                classes.insert(class.name().to_string(), class);
            }
            SchemaInner {
                connection,
                classes,
            }
        });
        tracing::debug!(classes = inner.classes.len(), "schema built");
        Schema::from_inner(inner)
    }
}
