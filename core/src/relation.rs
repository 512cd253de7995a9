//! Scoped queries over a model class.
//!
//! A `Relation` is a class, a path template and accumulated parameters.
//! Building one never performs a request; `fetch`, `find_one`, `load`,
//! `first` and `find` do. Parameters that fill placeholders in the template
//! are consumed by the path, the rest travel as the query string. Models
//! built through a relation remember its template and start out with its
//! parameters as attributes, so `user.posts().build(…)` already knows its
//! `user_id`.

use serde_json::Value;

use crate::attributes::{is_blank, Params};
use crate::class::ModelClass;
use crate::collection::Collection;
use crate::error::ModelError;
use crate::model::Model;
use crate::path::Path;
use crate::result::Envelope;

#[derive(Debug, Clone)]
pub struct Relation {
    class: ModelClass,
    uri: Option<String>,
    params: Params,
    embedded: Option<Value>,
}

impl Relation {
    pub fn new(class: ModelClass) -> Self {
        Self {
            class,
            uri: None,
            params: Params::new(),
            embedded: None,
        }
    }

    pub fn class(&self) -> &ModelClass {
        &self.class
    }

    pub fn uri_template(&self) -> &str {
        self.uri.as_deref().unwrap_or_else(|| self.class.uri())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    /// Merge `conditions` into the parameters; later values win.
    pub fn filter(&self, conditions: Params) -> Relation {
        let mut relation = self.clone();
        relation.embedded = None;
        for (key, value) in conditions {
            relation.params.insert(key, value);
        }
        relation
    }

    pub fn with_uri(&self, template: &str) -> Relation {
        let mut relation = self.clone();
        relation.uri = Some(template.to_string());
        relation
    }

    /// Serve results from `data` instead of the network.
    pub(crate) fn embedded(mut self, data: Value) -> Relation {
        self.embedded = Some(data);
        self
    }

    pub fn path(&self) -> Path {
        Path::new(self.uri_template(), self.params.clone())
    }

    /// The raw envelope for this scope.
    pub fn fetch(&self) -> Result<Envelope, ModelError> {
        if let Some(data) = &self.embedded {
            return Ok(Envelope {
                data: data.clone(),
                ..Envelope::default()
            });
        }
        let path = self.path();
        let variables = path.variables();
        let query: Params = self
            .params
            .iter()
            .filter(|(k, _)| !variables.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.class.get_raw(&path.resolve()?, &query)
    }

    pub fn find_one(&self) -> Result<Option<Model>, ModelError> {
        Ok(self.model_from(self.fetch()?))
    }

    pub fn load(&self) -> Result<Collection, ModelError> {
        Ok(self.collection_from(self.fetch()?))
    }

    pub fn first(&self) -> Result<Option<Model>, ModelError> {
        Ok(self.load()?.into_iter().next())
    }

    /// The record whose primary key is `id`; blank ids and empty responses
    /// are `NotFound`.
    pub fn find(&self, id: impl Into<Value>) -> Result<Model, ModelError> {
        let id = id.into();
        if is_blank(&id) {
            return Err(self.class.not_found(&id));
        }
        let mut conditions = Params::new();
        conditions.insert(self.class.primary_key().to_string(), id.clone());
        self.filter(conditions)
            .find_one()?
            .ok_or_else(|| self.class.not_found(&id))
    }

    pub fn build(&self, attributes: Params) -> Model {
        Model::build(self.class.clone(), self.uri_template(), &self.params, attributes)
    }

    pub fn create(&self, attributes: Params) -> Result<Model, ModelError> {
        let mut model = self.build(attributes);
        model.save()?;
        Ok(model)
    }

    pub(crate) fn model_from(&self, envelope: Envelope) -> Option<Model> {
        let record = match envelope.data {
            Value::Array(items) => items.into_iter().next()?,
            data => data,
        };
        match record {
            Value::Object(attributes) => Some(self.build(attributes)),
            _ => None,
        }
    }

    /// One model per record, in order; records that are not objects become
    /// models without attributes.
    pub(crate) fn collection_from(&self, envelope: Envelope) -> Collection {
        let records = match envelope.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        let models = records
            .into_iter()
            .map(|record| match record {
                Value::Object(attributes) => self.build(attributes),
                Value::Null => self.build(Params::new()),
                other => {
                    tracing::debug!(class = self.class.name(), record = %other, "record is not an object");
                    self.build(Params::new())
                }
            })
            .collect();
        Collection::new(models, envelope.metadata)
    }
}
