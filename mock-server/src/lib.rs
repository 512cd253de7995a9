use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub uuid: Uuid,
    pub user_id: u64,
    pub title: String,
}

#[derive(Default)]
pub struct Store {
    next_user_id: u64,
    users: BTreeMap<u64, User>,
    posts: Vec<Post>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
}

type Reply = (StatusCode, Json<Value>);

fn data(status: StatusCode, data: impl Serialize) -> Reply {
    (status, Json(json!({ "data": data, "metadata": {}, "errors": {} })))
}

fn invalid(data: Value, errors: Value) -> Reply {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "data": data, "metadata": {}, "errors": errors })),
    )
}

fn not_found() -> Reply {
    (StatusCode::NOT_FOUND, Json(json!({ "data": null, "errors": {} })))
}

/// The attributes under `root`, or the whole body when it is not wrapped.
fn unwrap_root(body: Value, root: &str) -> Map<String, Value> {
    match body {
        Value::Object(mut map) => match map.remove(root) {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                map.insert(root.to_string(), other);
                map
            }
            None => map,
        },
        _ => Map::new(),
    }
}

fn string_field(attrs: &Map<String, Value>, key: &str) -> Option<String> {
    attrs.get(key).and_then(Value::as_str).map(str::to_string)
}

fn user_errors(store: &Store, name: &str, except_id: Option<u64>) -> Map<String, Value> {
    let mut errors = Map::new();
    if name.trim().is_empty() {
        errors.insert("name".to_string(), json!([{ "error": "blank" }]));
    } else if store
        .users
        .values()
        .any(|u| u.name == name && Some(u.id) != except_id)
    {
        errors.insert("name".to_string(), json!([{ "error": "taken" }]));
    }
    errors
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/activate", post(activate_user))
        .route("/users/{id}/posts", get(list_posts).post(create_post))
        .route("/posts/{uuid}", get(get_post))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    tracing::info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>, Query(query): Query<ListQuery>) -> Reply {
    let store = db.read().await;
    let users: Vec<&User> = store
        .users
        .values()
        .filter(|u| query.name.as_ref().map_or(true, |name| &u.name == name))
        .collect();
    let total = users.len();
    (
        StatusCode::OK,
        Json(json!({ "data": users, "metadata": { "total": total }, "errors": {} })),
    )
}

async fn create_user(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let attrs = unwrap_root(body, "user");
    let name = string_field(&attrs, "name").unwrap_or_default();
    let mut store = db.write().await;

    let errors = user_errors(&store, &name, None);
    if !errors.is_empty() {
        return invalid(Value::Object(attrs), Value::Object(errors));
    }

    store.next_user_id += 1;
    let user = User {
        id: store.next_user_id,
        name,
        email: string_field(&attrs, "email").unwrap_or_default(),
        active: false,
    };
    store.users.insert(user.id, user.clone());
    tracing::debug!(id = user.id, "user created");
    data(StatusCode::CREATED, user)
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let store = db.read().await;
    match store.users.get(&id) {
        Some(user) => data(StatusCode::OK, user),
        None => not_found(),
    }
}

/// Applies the valid fields and reports the invalid ones; the response
/// always carries the stored record.
async fn update_user(State(db): State<Db>, Path(id): Path<u64>, Json(body): Json<Value>) -> Reply {
    let attrs = unwrap_root(body, "user");
    let mut store = db.write().await;
    let Some(current) = store.users.get(&id).cloned() else {
        return not_found();
    };

    let mut errors = Map::new();
    let mut updated = current;
    if let Some(name) = string_field(&attrs, "name") {
        errors = user_errors(&store, &name, Some(id));
        if errors.is_empty() {
            updated.name = name;
        }
    }
    if let Some(email) = string_field(&attrs, "email") {
        updated.email = email;
    }
    store.users.insert(id, updated.clone());

    if errors.is_empty() {
        data(StatusCode::OK, updated)
    } else {
        invalid(json!(updated), Value::Object(errors))
    }
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    let mut store = db.write().await;
    match store.users.remove(&id) {
        Some(_) => {
            store.posts.retain(|p| p.user_id != id);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn activate_user(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let mut store = db.write().await;
    match store.users.get_mut(&id) {
        Some(user) => {
            user.active = true;
            data(StatusCode::OK, user.clone())
        }
        None => not_found(),
    }
}

async fn list_posts(State(db): State<Db>, Path(user_id): Path<u64>) -> Reply {
    let store = db.read().await;
    if !store.users.contains_key(&user_id) {
        return not_found();
    }
    let posts: Vec<&Post> = store.posts.iter().filter(|p| p.user_id == user_id).collect();
    let total = posts.len();
    (
        StatusCode::OK,
        Json(json!({ "data": posts, "metadata": { "total": total } })),
    )
}

async fn create_post(
    State(db): State<Db>,
    Path(user_id): Path<u64>,
    Json(body): Json<Value>,
) -> Reply {
    let attrs = unwrap_root(body, "post");
    let mut store = db.write().await;
    if !store.users.contains_key(&user_id) {
        return not_found();
    }
    let title = string_field(&attrs, "title").unwrap_or_default();
    if title.trim().is_empty() {
        return invalid(
            Value::Object(attrs),
            json!({ "title": [{ "error": "can't be blank", "use_i18n": false }] }),
        );
    }
    let post = Post {
        uuid: Uuid::new_v4(),
        user_id,
        title,
    };
    store.posts.push(post.clone());
    data(StatusCode::CREATED, post)
}

async fn get_post(State(db): State<Db>, Path(uuid): Path<Uuid>) -> Reply {
    let store = db.read().await;
    match store.posts.iter().find(|p| p.uuid == uuid) {
        Some(post) => data(StatusCode::OK, post),
        None => not_found(),
    }
}
