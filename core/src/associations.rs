//! Declared relationships between model classes.
//!
//! # Design
//! An association is a strategy that, given the owning model, produces the
//! related record(s). `has_many` yields a lazy `Relation` so nothing is
//! fetched until the caller loads it; `has_one` and `belongs_to` fetch
//! immediately. When the owner already carries the related data under the
//! association's name (an embedded payload) it is used directly and no
//! request is made. Nothing is cached: every access builds afresh.

use std::fmt;

use serde_json::Value;

use crate::attributes::{is_blank, Params};
use crate::error::ModelError;
use crate::model::Model;
use crate::relation::Relation;

/// What an association resolves to.
#[derive(Debug)]
pub enum Related {
    One(Option<Model>),
    Many(Relation),
}

impl Related {
    pub fn into_one(self) -> Option<Model> {
        match self {
            Related::One(model) => model,
            Related::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<Relation> {
        match self {
            Related::Many(relation) => Some(relation),
            Related::One(_) => None,
        }
    }
}

/// Builds the related record(s) for one owning model.
pub trait AssociationBuilder: Send + Sync {
    fn build(&self, owner: &Model) -> Result<Related, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    HasMany,
    HasOne,
    BelongsTo,
}

#[derive(Clone)]
pub struct Association {
    name: String,
    class_name: String,
    kind: AssociationKind,
    uri: Option<String>,
    foreign_key: Option<String>,
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({} -> {})", self.kind, self.name, self.class_name)
    }
}

impl Association {
    fn new(kind: AssociationKind, name: &str, class_name: &str) -> Self {
        Self {
            name: name.to_string(),
            class_name: class_name.to_string(),
            kind,
            uri: None,
            foreign_key: None,
        }
    }

    /// `/<owner plural>/:<owner>_id/<name>/(:id)` by default.
    pub fn has_many(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::HasMany, name, class_name)
    }

    /// `/<owner plural>/:<owner>_id/<name>` by default.
    pub fn has_one(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::HasOne, name, class_name)
    }

    /// The target class's own template, keyed by `<name>_id` on the owner.
    pub fn belongs_to(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::BelongsTo, name, class_name)
    }

    pub fn uri(mut self, template: &str) -> Self {
        self.uri = Some(template.to_string());
        self
    }

    pub fn foreign_key(mut self, key: &str) -> Self {
        self.foreign_key = Some(key.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    fn owner_key(&self, owner: &Model) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", owner.class().model_name().element))
    }
}

impl AssociationBuilder for Association {
    fn build(&self, owner: &Model) -> Result<Related, ModelError> {
        let target = owner.class().schema()?.class(&self.class_name)?;
        let embedded = owner
            .attributes()
            .get(&self.name)
            .filter(|v| !v.is_null())
            .cloned();

        match self.kind {
            AssociationKind::HasMany => {
                let foreign_key = self.owner_key(owner);
                let template = self.uri.clone().unwrap_or_else(|| {
                    format!(
                        "/{}/:{}/{}/(:{})",
                        owner.class().model_name().plural,
                        foreign_key,
                        self.name,
                        target.primary_key()
                    )
                });
                let mut params = Params::new();
                params.insert(foreign_key, owner.id().cloned().unwrap_or(Value::Null));
                let relation = target.with_uri(&template).filter(params);
                Ok(Related::Many(match embedded {
                    Some(data) => relation.embedded(data),
                    None => relation,
                }))
            }
            AssociationKind::HasOne => {
                let foreign_key = self.owner_key(owner);
                let template = self.uri.clone().unwrap_or_else(|| {
                    format!(
                        "/{}/:{}/{}",
                        owner.class().model_name().plural,
                        foreign_key,
                        self.name
                    )
                });
                let mut params = Params::new();
                params.insert(foreign_key, owner.id().cloned().unwrap_or(Value::Null));
                let relation = target.with_uri(&template).filter(params);
                match embedded {
                    Some(data) => Ok(Related::One(relation.embedded(data).find_one()?)),
                    None => Ok(Related::One(relation.find_one()?)),
                }
            }
            AssociationKind::BelongsTo => {
                let foreign_key = self
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", self.name));
                let template = self.uri.clone().unwrap_or_else(|| target.uri().to_string());
                if let Some(data) = embedded {
                    return Ok(Related::One(
                        target.with_uri(&template).embedded(data).find_one()?,
                    ));
                }
                let key_value = owner.attributes().get(&foreign_key).cloned().unwrap_or(Value::Null);
                if is_blank(&key_value) {
                    return Ok(Related::One(None));
                }
                let mut params = Params::new();
                params.insert(target.primary_key().to_string(), key_value);
                Ok(Related::One(target.with_uri(&template).filter(params).find_one()?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::params_from;
    use crate::class::ModelClass;
    use crate::config::Config;
    use crate::connection::Connection;
    use crate::mock::MockTransport;
    use crate::schema::Schema;
    use serde_json::json;

    /// Related posts are the ones tagged with the owner's name.
    struct TaggedPosts;

    impl AssociationBuilder for TaggedPosts {
        fn build(&self, owner: &Model) -> Result<Related, ModelError> {
            let posts = owner.class().schema()?.class("Post")?;
            let tag = owner.read_attribute("name");
            Ok(Related::Many(posts.filter(params_from(json!({ "tag": tag })))))
        }
    }

    fn schema(mock: &MockTransport) -> Schema {
        let connection = Connection::new(Config::new("http://api.test"), mock.clone());
        Schema::builder(connection)
            .model(
                ModelClass::builder("User")
                    .has_one("profile", "Profile")
                    .belongs_to("team", "Team")
                    .belongs_to("mentor", "Ghost")
                    .custom_association("tagged", TaggedPosts),
            )
            .model(ModelClass::builder("Profile"))
            .model(ModelClass::builder("Post"))
            .model(ModelClass::builder("Team"))
            .build()
    }

    fn user(schema: &Schema, attrs: Value) -> Model {
        schema.class("User").unwrap().new_model(params_from(attrs))
    }

    #[test]
    fn has_one_uses_the_nested_default_template() {
        let mock = MockTransport::new();
        mock.respond_json(200, json!({"data": {"id": 9, "bio": "hi"}}));
        let schema = schema(&mock);

        let profile = user(&schema, json!({"id": 3}))
            .association("profile")
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(profile.read_attribute("bio"), "hi");
        assert_eq!(mock.last_request().unwrap().url, "http://api.test/users/3/profile");
    }

    #[test]
    fn has_one_with_empty_response_is_none() {
        let mock = MockTransport::new();
        mock.respond_json(404, json!({"data": null}));
        let schema = schema(&mock);

        let related = user(&schema, json!({"id": 3})).association("profile").unwrap();
        assert!(related.into_one().is_none());
    }

    #[test]
    fn belongs_to_reads_the_named_foreign_key() {
        let mock = MockTransport::new();
        mock.respond_json(200, json!({"data": {"id": 4, "name": "core"}}));
        let schema = schema(&mock);

        let team = user(&schema, json!({"id": 1, "team_id": 4}))
            .association("team")
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(team.id(), Some(&json!(4)));
        assert_eq!(mock.last_request().unwrap().url, "http://api.test/teams/4");
    }

    #[test]
    fn custom_builders_receive_the_owner() {
        let mock = MockTransport::new();
        let schema = schema(&mock);

        let tagged = user(&schema, json!({"name": "rust"}))
            .association("tagged")
            .unwrap()
            .into_many()
            .unwrap();
        assert_eq!(tagged.params()["tag"], "rust");
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn undeclared_association_is_reported() {
        let schema = schema(&MockTransport::new());
        match user(&schema, json!({})).association("friends").unwrap_err() {
            ModelError::UnknownAssociation { class, name } => {
                assert_eq!(class, "User");
                assert_eq!(name, "friends");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn target_class_missing_from_the_schema_fails_on_access() {
        let schema = schema(&MockTransport::new());
        let err = user(&schema, json!({"mentor_id": 1}))
            .association("mentor")
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownClass(name) if name == "Ghost"));
    }

    #[test]
    fn debug_names_kind_and_target() {
        let association = Association::has_many("posts", "Post");
        assert_eq!(format!("{association:?}"), "HasMany(posts -> Post)");
        assert_eq!(association.kind(), AssociationKind::HasMany);
    }
}
