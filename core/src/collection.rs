use std::ops::Deref;

use serde_json::Value;

use crate::model::Model;

/// Models mapped from one response, plus that response's metadata
/// (pagination and the like).
#[derive(Debug, Clone)]
pub struct Collection {
    models: Vec<Model>,
    metadata: Value,
}

impl Collection {
    pub fn new(models: Vec<Model>, metadata: Value) -> Self {
        Self { models, metadata }
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn into_vec(self) -> Vec<Model> {
        self.models
    }
}

impl Deref for Collection {
    type Target = [Model];

    fn deref(&self) -> &[Model] {
        &self.models
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
