//! A model instance: one remote resource held as an attribute bag.
//!
//! # Design
//! A `Model` owns its attributes, the path template it was built with and
//! the validation errors accumulated from responses. Every HTTP verb runs
//! against the instance's own resolved path (or an action derived from it),
//! then folds the response back in: `errors` are appended to the error
//! collection and `data` is reassigned through the setter protocol, even
//! when the response also carried errors. The server's returned state is
//! trusted either way.
//!
//! Dynamic member access goes through `send`; the typed helpers
//! (`read_attribute`, `write_attribute`, `predicate`, `association`) are the
//! same operations without the name parsing.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::associations::Related;
use crate::attributes::{is_blank, is_truthy, Attributes, Params};
use crate::class::ModelClass;
use crate::dispatch::{resolve, Member, Resolved};
use crate::error::ModelError;
use crate::http::HttpMethod;
use crate::path::Path;
use crate::result::Envelope;
use crate::validation::ValidationErrors;

/// Where an instance-level verb sends its request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// The instance's own resolved path.
    #[default]
    Own,
    /// The own path plus one segment, e.g. `/users/1/publish`.
    Member(String),
    /// A different template resolved against the same attributes.
    Template(String),
}

#[derive(Clone)]
pub struct Model {
    class: ModelClass,
    attributes: Attributes,
    uri_template: String,
    errors: ValidationErrors,
}

impl Model {
    pub(crate) fn build(
        class: ModelClass,
        uri_template: &str,
        seed: &Params,
        attributes: Params,
    ) -> Self {
        let mut model = Self {
            attributes: Attributes::seeded(class.coercions(), seed),
            uri_template: uri_template.to_string(),
            errors: ValidationErrors::new(),
            class,
        };
        model.assign(attributes);
        model
    }

    pub fn class(&self) -> &ModelClass {
        &self.class
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn uri_template(&self) -> &str {
        &self.uri_template
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Apply `attributes` through each key's setter, in order.
    ///
    /// With a custom primary key, an incoming `id` that arrives alongside the
    /// primary key is stored as a plain `id` attribute first, so it cannot be
    /// routed through `id=` and overwrite the primary key.
    pub fn assign(&mut self, mut attributes: Params) {
        if attributes.is_empty() {
            return;
        }
        let primary_key = self.class.primary_key().to_string();
        if primary_key != "id" && attributes.contains_key("id") && attributes.contains_key(&primary_key) {
            if let Some(id) = attributes.shift_remove("id") {
                self.attributes.set("id", id);
            }
        }
        for (key, value) in attributes {
            self.apply_setter(&key, value);
        }
    }

    /// The `key=` member with exactly one argument.
    fn apply_setter(&mut self, key: &str, value: Value) {
        if key == "id" {
            self.set_id(value);
        } else if let Some(writer) = self.class.writer(key) {
            writer(&mut *self, value);
        } else {
            self.write_attribute(key, value);
        }
    }

    pub fn read_attribute(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn write_attribute(&mut self, name: &str, value: Value) {
        self.attributes.set(name, value);
    }

    /// Truthiness of an attribute; missing attributes are false.
    pub fn predicate(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(is_truthy)
    }

    pub fn association(&self, name: &str) -> Result<Related, ModelError> {
        let builder = self
            .class
            .association(name)
            .ok_or_else(|| ModelError::UnknownAssociation {
                class: self.class.name().to_string(),
                name: name.to_string(),
            })?;
        builder.build(self)
    }

    // -----------------------------------------------------------------------
    // Dynamic members
    // -----------------------------------------------------------------------

    /// Call a member by name, e.g. `send("name", vec![])`,
    /// `send("admin?", vec![])`, `send("name=", vec![json!("Ada")])` or
    /// `send("posts", vec![])`.
    pub fn send(&mut self, name: &str, args: Vec<Value>) -> Result<Member, ModelError> {
        let resolved = resolve(self, name, args.len())?;
        let mut args = args.into_iter();
        let mut arg = || args.next().unwrap_or(Value::Null);

        let member = match resolved {
            Resolved::ReadId => Member::Value(self.id().cloned().unwrap_or(Value::Null)),
            Resolved::WriteId => {
                let value = arg();
                self.set_id(value.clone());
                Member::Value(value)
            }
            Resolved::Reader(name) => match self.class.reader(&name) {
                Some(reader) => Member::Value(reader(self)),
                None => Member::Value(self.read_attribute(&name)),
            },
            Resolved::Writer(name) => {
                let value = arg();
                match self.class.writer(&name) {
                    Some(writer) => writer(&mut *self, value.clone()),
                    None => self.write_attribute(&name, value.clone()),
                }
                Member::Value(value)
            }
            Resolved::Declared(name) | Resolved::Attribute(name) => {
                Member::Value(self.read_attribute(&name))
            }
            Resolved::Association(name) => Member::Related(self.association(&name)?),
            Resolved::Predicate(name) => Member::Value(Value::Bool(self.predicate(&name))),
            Resolved::Setter(name) => {
                let value = arg();
                self.write_attribute(&name, value.clone());
                Member::Value(value)
            }
        };
        Ok(member)
    }

    /// Whether `name` is a member this model answers to with `arity`
    /// arguments. Catch-all setters (`anything=`) are accepted by `send` but
    /// not reported here; class writers and `id=` are.
    pub fn responds_to(&self, name: &str, arity: usize) -> bool {
        matches!(resolve(self, name, arity), Ok(resolved) if !matches!(resolved, Resolved::Setter(_)))
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// The primary-key value, if set and not null.
    pub fn id(&self) -> Option<&Value> {
        self.attributes
            .get(self.class.primary_key())
            .filter(|v| !v.is_null())
    }

    /// Set the primary key; blank values are ignored.
    pub fn set_id(&mut self, value: Value) {
        if !is_blank(&value) {
            let key = self.class.primary_key().to_string();
            self.attributes.set(&key, value);
        }
    }

    pub fn persisted(&self) -> bool {
        self.id().is_some_and(|id| !is_blank(id))
    }

    pub fn as_json(&self) -> Value {
        Value::Object(self.attributes.as_map().clone())
    }

    /// Same class and identical attributes, primary key or not.
    pub fn attributes_eq(&self, other: &Model) -> bool {
        self.class == other.class && self.attributes == other.attributes
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    pub fn uri(&self) -> Path {
        Path::new(&self.uri_template, self.attributes.as_map().clone())
    }

    pub fn path_for(&self, target: &Target) -> Path {
        match target {
            Target::Own => self.uri(),
            Target::Member(action) => self.uri().join(action),
            Target::Template(template) => self.uri().with_template(template),
        }
    }

    // -----------------------------------------------------------------------
    // Instance-level verbs
    // -----------------------------------------------------------------------

    pub fn request_raw(
        &self,
        method: HttpMethod,
        target: &Target,
        params: &Params,
    ) -> Result<Envelope, ModelError> {
        let path = self.path_for(target).resolve()?;
        self.class.request_raw(method, &path, params)
    }

    /// Perform the request and fold the response into this model.
    pub fn request(
        &mut self,
        method: HttpMethod,
        target: &Target,
        params: &Params,
    ) -> Result<&mut Self, ModelError> {
        let envelope = self.request_raw(method, target, params)?;
        self.absorb(envelope);
        Ok(self)
    }

    fn absorb(&mut self, envelope: Envelope) {
        if envelope.has_errors() {
            tracing::debug!(
                class = self.class.name(),
                fields = envelope.errors.len(),
                "response carried validation errors"
            );
        }
        self.errors.add_from_envelope(&envelope.errors);
        if let Value::Object(data) = envelope.data {
            self.assign(data);
        }
    }

    pub fn get_raw(&self, target: &Target, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Get, target, params)
    }

    pub fn post_raw(&self, target: &Target, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Post, target, params)
    }

    pub fn put_raw(&self, target: &Target, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Put, target, params)
    }

    pub fn patch_raw(&self, target: &Target, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Patch, target, params)
    }

    pub fn delete_raw(&self, target: &Target, params: &Params) -> Result<Envelope, ModelError> {
        self.request_raw(HttpMethod::Delete, target, params)
    }

    pub fn get(&mut self, target: &Target, params: &Params) -> Result<&mut Self, ModelError> {
        self.request(HttpMethod::Get, target, params)
    }

    pub fn post(&mut self, target: &Target, params: &Params) -> Result<&mut Self, ModelError> {
        self.request(HttpMethod::Post, target, params)
    }

    pub fn put(&mut self, target: &Target, params: &Params) -> Result<&mut Self, ModelError> {
        self.request(HttpMethod::Put, target, params)
    }

    pub fn patch(&mut self, target: &Target, params: &Params) -> Result<&mut Self, ModelError> {
        self.request(HttpMethod::Patch, target, params)
    }

    pub fn delete(&mut self, target: &Target, params: &Params) -> Result<&mut Self, ModelError> {
        self.request(HttpMethod::Delete, target, params)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Attributes as a request body: path variables removed, wrapped in the
    /// element name when the class includes a root.
    pub fn to_params(&self) -> Params {
        let variables = self.uri().variables();
        let keys: Vec<&str> = variables.iter().map(String::as_str).collect();
        let body = self.attributes.except(&keys);
        if !self.class.include_root() {
            return body;
        }
        let mut wrapped = Params::new();
        wrapped.insert(self.class.model_name().element.clone(), Value::Object(body));
        wrapped
    }

    /// POST when new, otherwise the class's update verb.
    pub fn save(&mut self) -> Result<&mut Self, ModelError> {
        let method = if self.persisted() {
            self.class.update_method()
        } else {
            HttpMethod::Post
        };
        let params = self.to_params();
        self.request(method, &Target::Own, &params)
    }

    pub fn update(&mut self, attributes: Params) -> Result<&mut Self, ModelError> {
        self.assign(attributes);
        self.save()
    }

    pub fn destroy(&mut self) -> Result<&mut Self, ModelError> {
        self.delete(&Target::Own, &Params::new())
    }

    /// Refetch by primary key and reassign what the server returns.
    pub fn reload(&mut self) -> Result<&mut Self, ModelError> {
        let id = self.id().cloned().unwrap_or(Value::Null);
        let fresh = self.class.find(id)?;
        self.assign(fresh.attributes.as_map().clone());
        Ok(self)
    }
}

impl PartialEq for Model {
    /// Same class and the same, present primary key.
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.persisted() && self.id() == other.id()
    }
}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().map(|id| id.to_string()).hash(state);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id().cloned().unwrap_or(Value::Null);
        write!(f, "#<{}({}) id: {}", self.class.name(), self.uri_template, id)?;
        for (key, value) in self.attributes.iter() {
            if key != self.class.primary_key() {
                write!(f, " {key}: {value}")?;
            }
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associations::Association;
    use crate::attributes::{params_from, Coercion};
    use crate::config::Config;
    use crate::connection::Connection;
    use crate::mock::MockTransport;
    use crate::schema::Schema;
    use crate::validation::Message;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;

    fn schema(mock: &MockTransport) -> Schema {
        let connection = Connection::new(Config::new("http://api.test"), mock.clone());
        Schema::builder(connection)
            .model(
                ModelClass::builder("User")
                    .attributes(["name", "email"])
                    .coerce("age", Coercion::Integer)
                    .has_many("posts", "Post")
                    .has_one("profile", "Profile")
                    .reader("display_name", |m| {
                        let name = m.read_attribute("name");
                        json!(format!("{} <{}>", name.as_str().unwrap_or(""), m.read_attribute("email").as_str().unwrap_or("")))
                    })
                    .writer("email", |m, value| {
                        let lowered = value.as_str().map(str::to_lowercase).map(Value::from).unwrap_or(value);
                        m.write_attribute("email", lowered);
                    }),
            )
            .model(
                ModelClass::builder("Post")
                    .primary_key("uuid")
                    .include_root(false)
                    .belongs_to("user", "User")
                    .association(
                        Association::has_many("comments", "Comment")
                            .uri("/posts/:post_uuid/comments")
                            .foreign_key("post_uuid"),
                    ),
            )
            .model(ModelClass::builder("Comment"))
            .model(ModelClass::builder("Profile").uri("/profiles/(:id)"))
            .build()
    }

    fn user(schema: &Schema, attrs: Value) -> Model {
        schema.class("User").unwrap().new_model(params_from(attrs))
    }

    fn hash_of(model: &Model) -> u64 {
        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        hasher.finish()
    }

    // --- identity ---

    #[test]
    fn equal_present_ids_are_equal_and_hash_equal() {
        let schema = schema(&MockTransport::new());
        let a = user(&schema, json!({"id": 1, "name": "a"}));
        let b = user(&schema, json!({"id": 1, "name": "b"}));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn models_without_id_are_never_equal() {
        let schema = schema(&MockTransport::new());
        let a = user(&schema, json!({"name": "same"}));
        let b = user(&schema, json!({"name": "same"}));
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
        assert!(a.attributes_eq(&b));
    }

    #[test]
    fn different_classes_are_not_equal() {
        let schema = schema(&MockTransport::new());
        let user = user(&schema, json!({"id": 1}));
        let comment = schema.class("Comment").unwrap().new_model(params_from(json!({"id": 1})));
        assert_ne!(user, comment);
    }

    #[test]
    fn blank_id_assignment_is_ignored() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"id": 3}));
        model.set_id(json!(""));
        model.set_id(Value::Null);
        assert_eq!(model.id(), Some(&json!(3)));
    }

    #[test]
    fn debug_lists_template_id_and_other_attributes() {
        let schema = schema(&MockTransport::new());
        let model = user(&schema, json!({"name": "Ada", "id": 2, "age": 36}));
        assert_eq!(
            format!("{model:?}"),
            r#"#<User(/users/(:id)) id: 2 name: "Ada" age: 36>"#
        );
    }

    // --- assignment ---

    #[test]
    fn custom_primary_key_is_not_clobbered_by_id_in_either_order() {
        let schema = schema(&MockTransport::new());
        let posts = schema.class("Post").unwrap();
        for attrs in [json!({"id": 5, "uuid": 7}), json!({"uuid": 7, "id": 5})] {
            let post = posts.new_model(params_from(attrs));
            assert_eq!(post.read_attribute("id"), json!(5));
            assert_eq!(post.read_attribute("uuid"), json!(7));
            assert_eq!(post.id(), Some(&json!(7)));
        }
    }

    #[test]
    fn lone_id_routes_to_the_custom_primary_key() {
        let schema = schema(&MockTransport::new());
        let post = schema.class("Post").unwrap().new_model(params_from(json!({"id": 5})));
        assert_eq!(post.read_attribute("uuid"), json!(5));
        assert!(!post.attributes().contains("id"));
    }

    #[test]
    fn assignment_uses_class_writers() {
        let schema = schema(&MockTransport::new());
        let model = user(&schema, json!({"email": "ADA@Example.COM", "age": "36"}));
        assert_eq!(model.read_attribute("email"), json!("ada@example.com"));
        assert_eq!(model.read_attribute("age"), json!(36));
    }

    #[test]
    fn empty_assignment_is_a_no_op() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"name": "Ada"}));
        model.assign(Params::new());
        assert_eq!(model.attributes().len(), 1);
    }

    #[test]
    fn json_round_trip_preserves_all_attributes() {
        let schema = schema(&MockTransport::new());
        let original = user(&schema, json!({"a": 1, "b": 2}));
        let copy = user(&schema, original.as_json());
        assert!(original.attributes_eq(&copy));
        assert_eq!(copy.as_json(), json!({"a": 1, "b": 2}));
    }

    // --- dynamic members ---

    #[test]
    fn predicate_on_missing_attribute_is_false() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"active": 0}));
        let missing = model.send("foo?", vec![]).unwrap().into_value().unwrap();
        assert_eq!(missing, json!(false));
        let present = model.send("active?", vec![]).unwrap().into_value().unwrap();
        assert_eq!(present, json!(true));
    }

    #[test]
    fn setter_then_getter_returns_the_value() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({}));
        assert!(matches!(
            model.send("nickname", vec![]),
            Err(ModelError::UnknownMember { .. })
        ));
        model.send("nickname=", vec![json!("ace")]).unwrap();
        let value = model.send("nickname", vec![]).unwrap().into_value().unwrap();
        assert_eq!(value, json!("ace"));
    }

    #[test]
    fn getter_with_an_argument_is_invalid_not_unknown() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"nickname": "ace"}));
        let err = model.send("nickname", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { expected: 0, given: 1, .. }));

        let err = model.send("name", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { .. }));

        let err = model.send("posts", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { .. }));

        let err = model.send("nickname=", vec![]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { expected: 1, given: 0, .. }));

        let err = model.send("ok?", vec![json!(true)]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { .. }));
    }

    #[test]
    fn unknown_member_with_arguments_is_still_unknown() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({}));
        let err = model.send("frobnicate", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ModelError::UnknownMember { ref name, .. } if name == "frobnicate"));
    }

    #[test]
    fn declared_attributes_answer_before_any_value_is_set() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({}));
        let value = model.send("email", vec![]).unwrap().into_value().unwrap();
        assert_eq!(value, Value::Null);
        assert!(model.responds_to("name", 0));
        assert!(!model.responds_to("name", 1));
    }

    #[test]
    fn catch_all_setters_are_not_reported_as_members() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"admin": true}));
        assert!(!model.responds_to("anything=", 1));
        assert!(model.responds_to("email=", 1));
        assert!(model.responds_to("id=", 1));
        assert!(model.responds_to("admin", 0));
        assert!(model.responds_to("admin?", 0));
        assert!(model.responds_to("posts", 0));

        model.send("anything=", vec![json!(1)]).unwrap();
        assert!(model.responds_to("anything", 0));
    }

    #[test]
    fn readers_override_and_can_use_stored_values() {
        let schema = schema(&MockTransport::new());
        let mut model = user(&schema, json!({"name": "Ada", "email": "ada@x.io"}));
        let value = model.send("display_name", vec![]).unwrap().into_value().unwrap();
        assert_eq!(value, json!("Ada <ada@x.io>"));
    }

    #[test]
    fn id_members_use_the_primary_key() {
        let schema = schema(&MockTransport::new());
        let mut post = schema.class("Post").unwrap().new_model(Params::new());
        post.send("id=", vec![json!("p-1")]).unwrap();
        assert_eq!(post.read_attribute("uuid"), json!("p-1"));
        let id = post.send("id", vec![]).unwrap().into_value().unwrap();
        assert_eq!(id, json!("p-1"));
    }

    // --- associations ---

    #[test]
    fn has_many_is_lazy_and_scoped_to_the_owner() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 1}));

        let posts = model.send("posts", vec![]).unwrap().into_related().unwrap().into_many().unwrap();
        assert_eq!(mock.request_count(), 0);
        assert_eq!(posts.path().resolve().unwrap(), "/users/1/posts");

        mock.respond_json(200, json!({"data": [{"uuid": "a"}, {"uuid": "b"}]}));
        let loaded = posts.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].read_attribute("user_id"), json!(1));
        assert_eq!(mock.last_request().unwrap().url, "http://api.test/users/1/posts");
    }

    #[test]
    fn associations_are_rebuilt_on_every_access() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let model = user(&schema, json!({"id": 1}));
        mock.respond_json(200, json!({"data": {"id": 10, "bio": "x"}}));
        mock.respond_json(200, json!({"data": {"id": 10, "bio": "y"}}));

        let first = model.association("profile").unwrap().into_one().unwrap();
        let second = model.association("profile").unwrap().into_one().unwrap();
        assert_eq!(first.read_attribute("bio"), json!("x"));
        assert_eq!(second.read_attribute("bio"), json!("y"));
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request().unwrap().url, "http://api.test/users/1/profile");
    }

    #[test]
    fn belongs_to_fetches_by_foreign_key() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let post = schema
            .class("Post")
            .unwrap()
            .new_model(params_from(json!({"uuid": "p", "user_id": 4})));
        mock.respond_json(200, json!({"data": {"id": 4, "name": "Ada"}}));

        let owner = post.association("user").unwrap().into_one().unwrap();
        assert_eq!(owner.id(), Some(&json!(4)));
        assert_eq!(mock.last_request().unwrap().url, "http://api.test/users/4");
    }

    #[test]
    fn belongs_to_without_foreign_key_is_none_without_a_request() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let post = schema.class("Post").unwrap().new_model(Params::new());
        assert!(post.association("user").unwrap().into_one().is_none());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn embedded_association_data_is_used_directly() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let model = user(&schema, json!({"id": 1, "posts": [{"uuid": "a"}]}));
        let posts = model.association("posts").unwrap().into_many().unwrap();
        assert!(posts.is_embedded());
        assert_eq!(posts.load().unwrap().len(), 1);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn custom_association_uri_is_used() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let post = schema.class("Post").unwrap().new_model(params_from(json!({"uuid": "p"})));
        let comments = post.association("comments").unwrap().into_many().unwrap();
        assert_eq!(comments.path().resolve().unwrap(), "/posts/p/comments");
    }

    // --- verbs ---

    #[test]
    fn patch_with_data_and_errors_keeps_both() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 1, "name": "old"}));
        mock.respond_json(
            422,
            json!({"data": {"name": "x"}, "errors": {"name": [{"error": "taken"}]}}),
        );

        model.patch(&Target::Own, &params_from(json!({"name": "x"}))).unwrap();

        assert_eq!(model.read_attribute("name"), json!("x"));
        let errors = model.errors().get("name");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, Message::Key("taken".to_string()));
        let req = mock.last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, "http://api.test/users/1");
    }

    #[test]
    fn member_and_template_targets() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 7}));
        mock.respond_json(200, json!({"data": {"published": true}}));
        mock.respond_json(200, json!({"data": null}));

        model.post(&Target::Member("publish".to_string()), &Params::new()).unwrap();
        model
            .get(&Target::Template("/accounts/:id/summary".to_string()), &params_from(json!({"full": true})))
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://api.test/users/7/publish");
        assert_eq!(requests[1].url, "http://api.test/accounts/7/summary");
        assert_eq!(requests[1].query, vec![("full".to_string(), Some("true".to_string()))]);
        assert!(model.predicate("published"));
    }

    #[test]
    fn raw_verbs_leave_the_model_untouched() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let model = user(&schema, json!({"id": 7, "name": "a"}));
        mock.respond_json(200, json!({"data": {"name": "b"}, "errors": {"name": ["bad"]}}));
        let envelope = model.get_raw(&Target::Own, &Params::new()).unwrap();
        assert_eq!(envelope.data, json!({"name": "b"}));
        assert_eq!(model.read_attribute("name"), json!("a"));
        assert!(model.errors().is_empty());
    }

    #[test]
    fn transport_failure_leaves_the_model_untouched() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 7, "name": "a"}));
        mock.fail("timed out");
        assert!(matches!(
            model.put(&Target::Own, &Params::new()),
            Err(ModelError::Transport(_))
        ));
        assert_eq!(model.read_attribute("name"), json!("a"));
    }

    // --- persistence ---

    #[test]
    fn save_posts_new_records_wrapped_in_root() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"name": "Ada"}));
        mock.respond_json(201, json!({"data": {"id": 11, "name": "Ada"}}));

        model.save().unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://api.test/users");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"user": {"name": "Ada"}}));
        assert!(model.persisted());
        assert_eq!(model.id(), Some(&json!(11)));
    }

    #[test]
    fn save_puts_persisted_records_without_path_variables() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 11, "name": "Ada"}));
        mock.respond_json(200, json!({"data": {"id": 11, "name": "Ada"}}));

        model.update(params_from(json!({"name": "Ada L."}))).unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://api.test/users/11");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"user": {"name": "Ada L."}}));
    }

    #[test]
    fn destroy_and_reload() {
        let mock = MockTransport::new();
        let schema = schema(&mock);
        let mut model = user(&schema, json!({"id": 3, "name": "stale"}));
        mock.respond_json(200, json!({"data": {"id": 3, "name": "fresh"}}));
        mock.respond(204, "");

        model.reload().unwrap();
        assert_eq!(model.read_attribute("name"), json!("fresh"));
        model.destroy().unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://api.test/users/3");
        assert_eq!(requests[1].method, HttpMethod::Delete);
        assert!(requests[1].body.is_none());
    }
}
