use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub mod config;

pub const SCHEMA_MIME: &str = "application/schema+json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub hex: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<String>,
}

#[derive(Deserialize)]
pub struct FormQuery {
    pub method: Option<String>,
}

pub type Db = Arc<RwLock<Option<Profile>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(None));
    Router::new()
        .route(
            "/profile",
            get(read_profile)
                .post(create_profile)
                .put(replace_profile)
                .delete(delete_profile),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

/// Input schema the form for `method` is rendered from. `GET` takes no input
/// and gets an empty schema; verbs without a form get `None`.
pub fn schema_for(method: &str) -> Option<Value> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Some(json!({})),
        "POST" | "PUT" => Some(profile_schema()),
        _ => None,
    }
}

fn profile_schema() -> Value {
    json!({
        "type": "object",
        "title": "Profile",
        "required": ["name"],
        "properties": {
            "name": {"type": "string", "title": "Name", "description": "Full name"},
            "email": {"type": "string", "title": "Email", "format": "email"},
            "colour": {"$ref": "#/$defs/Color"},
            "joined": {"$ref": "#/$defs/Day", "title": "Joined", "format": "date"}
        },
        "$defs": {
            "Color": {
                "type": "object",
                "title": "Colour",
                "properties": {
                    "hex": {
                        "type": "string",
                        "title": "Hex",
                        "description": "Favourite colour",
                        "format": "rgb.Hex"
                    }
                }
            },
            "Day": {"type": "string"}
        }
    })
}

fn accepts(headers: &HeaderMap, mime: &str) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(mime))
}

async fn read_profile(
    State(db): State<Db>,
    Query(query): Query<FormQuery>,
    headers: HeaderMap,
) -> Response {
    if accepts(&headers, SCHEMA_MIME) {
        let method = query.method.as_deref().unwrap_or("POST");
        debug!(%method, "schema requested");
        return match schema_for(method) {
            Some(schema) => (
                [(header::CONTENT_TYPE, SCHEMA_MIME)],
                schema.to_string(),
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, format!("no form for {method}")).into_response(),
        };
    }
    if accepts(&headers, "text/html") {
        return Html(page_shell("Profile")).into_response();
    }
    match db.read().await.clone() {
        Some(profile) => Json(profile).into_response(),
        None => (StatusCode::NOT_FOUND, "no profile").into_response(),
    }
}

async fn create_profile(
    State(db): State<Db>,
    Json(mut input): Json<Profile>,
) -> (StatusCode, Json<Profile>) {
    input.id = Some(Uuid::new_v4());
    *db.write().await = Some(input.clone());
    (StatusCode::CREATED, Json(input))
}

async fn replace_profile(State(db): State<Db>, Json(mut input): Json<Profile>) -> StatusCode {
    let mut slot = db.write().await;
    input.id = slot.as_ref().and_then(|p| p.id);
    *slot = Some(input);
    StatusCode::NO_CONTENT
}

async fn delete_profile(State(db): State<Db>) -> StatusCode {
    match db.write().await.take() {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Page shell with one panel per verb and a hidden response area. The form
/// widgets themselves are mounted by the client.
fn page_shell(name: &str) -> String {
    let panels: String = ["GET", "POST", "PUT", "DELETE"]
        .iter()
        .map(|verb| format!("<div id=\"{verb}\" class=\"panel\"></div>\n"))
        .collect();
    format!(
        "<html>\n<head><title>{name}</title></head>\n<body>\n<h1>{name}</h1>\n{panels}<pre style=\"display: none;\"></pre>\n</body>\n</html>\n"
    )
}
