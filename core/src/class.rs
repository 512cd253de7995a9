//! The static side of a model: its path template, primary key, declared
//! attributes, coercions and associations, plus class-level HTTP verbs.
//!
//! # Design
//! `ModelClass` is a cheap handle (`Arc` inside) so every model instance can
//! point back at its class. Classes are declared with `ModelClassBuilder`
//! and only become usable once a `Schema` builds them, which is where the
//! shared `Connection` is injected.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::associations::{Association, AssociationBuilder};
use crate::attributes::{is_blank, Coercion, Params};
use crate::collection::Collection;
use crate::connection::Connection;
use crate::error::ModelError;
use crate::http::HttpMethod;
use crate::model::Model;
use crate::naming::ModelName;
use crate::relation::Relation;
use crate::result::Envelope;
use crate::schema::{Schema, SchemaInner};

/// A class-defined getter, consulted before the attribute store.
pub type Reader = Arc<dyn Fn(&Model) -> Value + Send + Sync>;
/// A class-defined setter, consulted before the attribute store.
pub type Writer = Arc<dyn Fn(&mut Model, Value) + Send + Sync>;

/// What a class-level verb produced from its response.
#[derive(Debug)]
pub enum Loaded {
    One(Model),
    Many(Collection),
    Nothing,
}

impl Loaded {
    pub fn into_one(self) -> Option<Model> {
        match self {
            Loaded::One(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_many(self) -> Option<Collection> {
        match self {
            Loaded::Many(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Loaded::Nothing)
    }
}

pub(crate) struct ClassInner {
    name: ModelName,
    uri: String,
    primary_key: String,
    declared: Vec<String>,
    coercions: Arc<BTreeMap<String, Coercion>>,
    associations: BTreeMap<String, Arc<dyn AssociationBuilder>>,
    readers: BTreeMap<String, Reader>,
    writers: BTreeMap<String, Writer>,
    include_root: bool,
    update_method: HttpMethod,
    connection: Arc<Connection>,
    schema: Weak<SchemaInner>,
}

#[derive(Clone)]
pub struct ModelClass {
    inner: Arc<ClassInner>,
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.inner.name.name)
            .field("uri", &self.inner.uri)
            .field("primary_key", &self.inner.primary_key)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ModelClass {
    pub fn builder(name: &str) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name.name
    }

    pub fn model_name(&self) -> &ModelName {
        &self.inner.name
    }

    /// The base path template, e.g. `/users/(:id)`.
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    pub fn declared_attributes(&self) -> &[String] {
        &self.inner.declared
    }

    pub fn include_root(&self) -> bool {
        self.inner.include_root
    }

    pub fn update_method(&self) -> HttpMethod {
        self.inner.update_method
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub fn schema(&self) -> Result<Schema, ModelError> {
        self.inner
            .schema
            .upgrade()
            .map(Schema::from_inner)
            .ok_or(ModelError::SchemaDropped)
    }

    pub(crate) fn coercions(&self) -> Arc<BTreeMap<String, Coercion>> {
        Arc::clone(&self.inner.coercions)
    }

    pub fn association(&self, name: &str) -> Option<Arc<dyn AssociationBuilder>> {
        self.inner.associations.get(name).cloned()
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.inner.associations.contains_key(name)
    }

    pub(crate) fn reader(&self, name: &str) -> Option<Reader> {
        self.inner.readers.get(name).cloned()
    }

    pub(crate) fn writer(&self, name: &str) -> Option<Writer> {
        self.inner.writers.get(name).cloned()
    }

    pub(crate) fn is_declared(&self, name: &str) -> bool {
        self.inner.declared.iter().any(|d| d == name)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn new_model(&self, attributes: Params) -> Model {
        Model::build(self.clone(), self.uri(), &Params::new(), attributes)
    }

    /// Construct, then hand the model to `init` for further configuration.
    pub fn new_model_with(&self, attributes: Params, init: impl FnOnce(&mut Model)) -> Model {
        let mut model = self.new_model(attributes);
        init(&mut model);
        model
    }

    /// A single model from the envelope's data, if there is any.
    pub fn model_from(&self, envelope: Envelope) -> Option<Model> {
        self.all().model_from(envelope)
    }

    pub fn collection_from(&self, envelope: Envelope) -> Collection {
        self.all().collection_from(envelope)
    }

    /// Array data maps to a collection, other non-null data to one model.
    pub fn loaded_from(&self, envelope: Envelope) -> Loaded {
        if envelope.is_collection() {
            Loaded::Many(self.collection_from(envelope))
        } else {
            self.model_from(envelope).map_or(Loaded::Nothing, Loaded::One)
        }
    }

    // -----------------------------------------------------------------------
    // Class-level verbs
    // -----------------------------------------------------------------------

    pub fn request_raw(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, ModelError> {
        self.inner.connection.request(method, path, params)
    }

    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<Loaded, ModelError> {
        let envelope = self.request_raw(method, path, params)?;
        Ok(self.loaded_from(envelope))
    }

    pub fn get_raw(&self, path: &str, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Get, path, params)
    }

    pub fn post_raw(&self, path: &str, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Post, path, params)
    }

    pub fn put_raw(&self, path: &str, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Put, path, params)
    }

    pub fn patch_raw(&self, path: &str, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Patch, path, params)
    }

    pub fn delete_raw(&self, path: &str, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Delete, path, params)
    }

    pub fn get(&self, path: &str, params: &Params) -> Result<Loaded, ModelError> {
        self.request(HttpMethod::Get, path, params)
    }

    pub fn post(&self, path: &str, params: &Params) -> Result<Loaded, ModelError> {
        self.request(HttpMethod::Post, path, params)
    }

    pub fn put(&self, path: &str, params: &Params) -> Result<Loaded, ModelError> {
        self.request(HttpMethod::Put, path, params)
    }

    pub fn patch(&self, path: &str, params: &Params) -> Result<Loaded, ModelError> {
        self.request(HttpMethod::Patch, path, params)
    }

    pub fn delete(&self, path: &str, params: &Params) -> Result<Loaded, ModelError> {
        self.request(HttpMethod::Delete, path, params)
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    pub fn all(&self) -> Relation {
        Relation::new(self.clone())
    }

    pub fn filter(&self, params: Params) -> Relation {
        self.all().filter(params)
    }

    pub fn with_uri(&self, template: &str) -> Relation {
        self.all().with_uri(template)
    }

    pub fn find(&self, id: impl Into<Value>) -> Result<Model, ModelError> {
        self.all().find(id)
    }

    pub fn create(&self, attributes: Params) -> Result<Model, ModelError> {
        self.all().create(attributes)
    }

    pub(crate) fn not_found(&self, id: &Value) -> ModelError {
        ModelError::NotFound {
            class: self.name().to_string(),
            id: if is_blank(id) { String::new() } else { id.to_string() },
        }
    }
}

/// Declares a model class. Built into a `ModelClass` by `SchemaBuilder::build`.
pub struct ModelClassBuilder {
    name: ModelName,
    uri: Option<String>,
    primary_key: String,
    declared: Vec<String>,
    coercions: BTreeMap<String, Coercion>,
    associations: BTreeMap<String, Arc<dyn AssociationBuilder>>,
    readers: BTreeMap<String, Reader>,
    writers: BTreeMap<String, Writer>,
    include_root: bool,
    update_method: HttpMethod,
}

impl ModelClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: ModelName::new(name),
            uri: None,
            primary_key: "id".to_string(),
            declared: Vec::new(),
            coercions: BTreeMap::new(),
            associations: BTreeMap::new(),
            readers: BTreeMap::new(),
            writers: BTreeMap::new(),
            include_root: true,
            update_method: HttpMethod::Put,
        }
    }

    pub fn name(&self) -> &str {
        &self.name.name
    }

    /// Override the default `/<plural>/(:<primary key>)` template.
    pub fn uri(mut self, template: &str) -> Self {
        self.uri = Some(template.to_string());
        self
    }

    pub fn primary_key(mut self, key: &str) -> Self {
        self.primary_key = key.to_string();
        self
    }

    pub fn plural(mut self, plural: &str) -> Self {
        self.name = self.name.with_plural(plural);
        self
    }

    /// Declare attributes that always answer their getter, even before the
    /// server has sent a value.
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.declared.contains(&name) {
                self.declared.push(name);
            }
        }
        self
    }

    pub fn coerce(mut self, attribute: &str, coercion: Coercion) -> Self {
        self.coercions.insert(attribute.to_string(), coercion);
        self
    }

    pub fn has_many(self, name: &str, class_name: &str) -> Self {
        self.association(Association::has_many(name, class_name))
    }

    pub fn has_one(self, name: &str, class_name: &str) -> Self {
        self.association(Association::has_one(name, class_name))
    }

    pub fn belongs_to(self, name: &str, class_name: &str) -> Self {
        self.association(Association::belongs_to(name, class_name))
    }

    pub fn association(self, association: Association) -> Self {
        let name = association.name().to_string();
        self.custom_association(&name, association)
    }

    pub fn custom_association(
        mut self,
        name: &str,
        builder: impl AssociationBuilder + 'static,
    ) -> Self {
        self.associations.insert(name.to_string(), Arc::new(builder));
        self
    }

    /// A getter that takes priority over the attribute store. The closure
    /// can still read the stored value with `Model::read_attribute`.
    pub fn reader(
        mut self,
        name: &str,
        reader: impl Fn(&Model) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.readers.insert(name.to_string(), Arc::new(reader));
        self
    }

    /// A setter for `name=` that takes priority over the attribute store.
    pub fn writer(
        mut self,
        name: &str,
        writer: impl Fn(&mut Model, Value) + Send + Sync + 'static,
    ) -> Self {
        self.writers.insert(name.to_string(), Arc::new(writer));
        self
    }

    /// Wrap request bodies from `save` in the element name (`{"user": {…}}`).
    pub fn include_root(mut self, include: bool) -> Self {
        self.include_root = include;
        self
    }

    /// The verb `save` uses for persisted models (PUT by default).
    pub fn update_method(mut self, method: HttpMethod) -> Self {
        self.update_method = method;
        self
    }

    pub(crate) fn build(self, connection: Arc<Connection>, schema: Weak<SchemaInner>) -> ModelClass {
        let uri = self
            .uri
            .unwrap_or_else(|| format!("/{}/(:{})", self.name.plural, self.primary_key));
        ModelClass {
            inner: Arc::new(ClassInner {
                name: self.name,
                uri,
                primary_key: self.primary_key,
                declared: self.declared,
                coercions: Arc::new(self.coercions),
                associations: self.associations,
                readers: self.readers,
                writers: self.writers,
                include_root: self.include_root,
                update_method: self.update_method,
                connection,
                schema,
            }),
        }
    }
}
