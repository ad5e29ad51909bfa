//! In-memory stand-in for the Keptn API endpoints the client consumes.
//!
//! Projects are created with a fixed set of stages; services added to a
//! project are deployed to every stage. Events are kept in submission order.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_STAGES: [&str; 3] = ["dev", "staging", "production"];
pub const AUTH_HEADER: &str = "x-token";
pub const KEPTN_CONTEXT_HEADER: &str = "ce-shkeptncontext";
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(rename = "keptnContext")]
    pub keptn_context: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: Option<String>,
    pub shipyard: Option<String>,
    #[serde(rename = "gitRemoteURL")]
    pub git_remote_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateService {
    #[serde(rename = "serviceName")]
    pub service_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(rename = "keptnContext")]
    pub keptn_context: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Deserialize)]
pub struct StageQuery {
    #[serde(rename = "pageSize")]
    pub page_size: Option<usize>,
    #[serde(rename = "nextPageKey")]
    pub next_page_key: Option<String>,
}

#[derive(Debug, Default)]
struct ProjectRecord {
    services: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Store {
    projects: BTreeMap<String, ProjectRecord>,
    events: Vec<Value>,
}

struct AppState {
    store: RwLock<Store>,
    token: Option<String>,
}

type Shared = Arc<AppState>;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorBody>)>;

fn failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            code: status.as_u16(),
            message: message.into(),
        }),
    )
}

/// Router without authentication.
pub fn app() -> Router {
    router(None)
}

/// Router that rejects requests whose `x-token` header is not `token`.
pub fn app_with_token(token: impl Into<String>) -> Router {
    router(Some(token.into()))
}

fn router(token: Option<String>) -> Router {
    let state: Shared = Arc::new(AppState {
        store: RwLock::new(Store::default()),
        token,
    });
    Router::new()
        .route("/v1/event", get(get_event).post(send_event))
        .route(
            "/v1/project/{project}/stage/{stage}/service/{service}/evaluation",
            post(trigger_evaluation),
        )
        .route("/v1/metadata", get(metadata))
        .route(
            "/shipyard-controller/v1/project",
            post(create_project).put(update_project),
        )
        .route("/shipyard-controller/v1/project/{project}", delete(delete_project))
        .route("/shipyard-controller/v1/project/{project}/service", post(create_service))
        .route(
            "/shipyard-controller/v1/project/{project}/service/{service}",
            delete(delete_service),
        )
        .route("/controlPlane/v1/project/{project}/stage", get(get_stages))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

async fn require_token(State(state): State<Shared>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.token {
        let presented = request
            .headers()
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return failure(StatusCode::UNAUTHORIZED, "missing or malformed API token").into_response();
        }
    }
    next.run(request).await
}

/// Keptn names: lowercase letter first, then lowercase letters, digits, `-`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

async fn send_event(State(state): State<Shared>, Json(mut event): Json<Value>) -> ApiResult<Response> {
    if event.get("type").and_then(Value::as_str).is_none() {
        return Err(failure(StatusCode::BAD_REQUEST, "event type is required"));
    }
    let context = event
        .get("shkeptncontext")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    event["shkeptncontext"] = Value::String(context.clone());
    state.store.write().await.events.push(event);

    Ok((
        [(KEPTN_CONTEXT_HEADER, context.clone())],
        Json(EventContext { keptn_context: context }),
    )
        .into_response())
}

async fn get_event(State(state): State<Shared>, Query(query): Query<EventQuery>) -> ApiResult<Json<Value>> {
    let store = state.store.read().await;
    store
        .events
        .iter()
        .rev()
        .find(|e| {
            e["shkeptncontext"].as_str() == Some(query.keptn_context.as_str())
                && e["type"].as_str() == Some(query.event_type.as_str())
        })
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            failure(
                StatusCode::NOT_FOUND,
                format!(
                    "No {} event found for context {}",
                    query.event_type, query.keptn_context
                ),
            )
        })
}

async fn trigger_evaluation(
    State(state): State<Shared>,
    Path((project, stage, service)): Path<(String, String, String)>,
    Json(evaluation): Json<Value>,
) -> ApiResult<Json<EventContext>> {
    let mut store = state.store.write().await;
    let record = store
        .projects
        .get(&project)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("project {project} not found")))?;
    if !DEFAULT_STAGES.contains(&stage.as_str()) {
        return Err(failure(StatusCode::NOT_FOUND, format!("stage {stage} not found")));
    }
    if !record.services.contains(&service) {
        return Err(failure(StatusCode::NOT_FOUND, format!("service {service} not found")));
    }

    let context = Uuid::new_v4().to_string();
    store.events.push(json!({
        "id": Uuid::new_v4().to_string(),
        "type": format!("sh.keptn.event.{stage}.evaluation.triggered"),
        "shkeptncontext": context.clone(),
        "data": {
            "project": project,
            "stage": stage,
            "service": service,
            "evaluation": evaluation,
        },
    }));
    Ok(Json(EventContext { keptn_context: context }))
}

async fn metadata() -> Json<Value> {
    Json(json!({
        "bridgeversion": "v1",
        "keptnlabel": "keptn",
        "keptnversion": "0.8.0",
        "namespace": "keptn",
        "shipyardversion": "spec.keptn.sh/0.2.0",
    }))
}

async fn create_project(State(state): State<Shared>, Json(input): Json<CreateProject>) -> ApiResult<Json<Value>> {
    let name = input.name.unwrap_or_default();
    if !is_valid_name(&name) {
        return Err(failure(StatusCode::BAD_REQUEST, "invalid project name"));
    }
    if input.shipyard.as_deref().unwrap_or_default().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "shipyard is required"));
    }
    let mut store = state.store.write().await;
    if store.projects.contains_key(&name) {
        return Err(failure(StatusCode::CONFLICT, format!("project {name} already exists")));
    }
    tracing::debug!(project = %name, "project created");
    store.projects.insert(name, ProjectRecord::default());
    Ok(Json(json!({})))
}

async fn update_project(State(state): State<Shared>, Json(input): Json<CreateProject>) -> ApiResult<Json<Value>> {
    let name = input.name.unwrap_or_default();
    let store = state.store.read().await;
    if !store.projects.contains_key(&name) {
        return Err(failure(StatusCode::NOT_FOUND, format!("project {name} not found")));
    }
    Ok(Json(json!({})))
}

async fn delete_project(State(state): State<Shared>, Path(project): Path<String>) -> ApiResult<Json<MessageBody>> {
    let mut store = state.store.write().await;
    store
        .projects
        .remove(&project)
        .map(|_| {
            Json(MessageBody {
                message: format!("{project} deleted"),
            })
        })
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("project {project} not found")))
}

async fn create_service(
    State(state): State<Shared>,
    Path(project): Path<String>,
    Json(input): Json<CreateService>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.write().await;
    let record = store
        .projects
        .get_mut(&project)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("project {project} not found")))?;
    let service = input.service_name.unwrap_or_default();
    if !is_valid_name(&service) {
        return Err(failure(StatusCode::BAD_REQUEST, "invalid service name"));
    }
    if !record.services.insert(service.clone()) {
        return Err(failure(StatusCode::CONFLICT, format!("service {service} already exists")));
    }
    Ok(Json(json!({})))
}

async fn delete_service(
    State(state): State<Shared>,
    Path((project, service)): Path<(String, String)>,
) -> ApiResult<Json<MessageBody>> {
    let mut store = state.store.write().await;
    let record = store
        .projects
        .get_mut(&project)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("project {project} not found")))?;
    if !record.services.remove(&service) {
        return Err(failure(StatusCode::NOT_FOUND, format!("service {service} not found")));
    }
    Ok(Json(MessageBody {
        message: format!("{service} deleted"),
    }))
}

async fn get_stages(
    State(state): State<Shared>,
    Path(project): Path<String>,
    Query(query): Query<StageQuery>,
) -> ApiResult<Json<Value>> {
    let store = state.store.read().await;
    let record = store
        .projects
        .get(&project)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("project {project} not found")))?;

    let page_size = query.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = match query.next_page_key.as_deref() {
        None | Some("") => 0,
        Some(key) => key
            .parse::<usize>()
            .map_err(|_| failure(StatusCode::BAD_REQUEST, "invalid nextPageKey"))?,
    };
    let end = offset.saturating_add(page_size).min(DEFAULT_STAGES.len());
    let services: Vec<Value> = record
        .services
        .iter()
        .map(|s| json!({"serviceName": s}))
        .collect();
    let stages: Vec<Value> = DEFAULT_STAGES
        .iter()
        .enumerate()
        .skip(offset)
        .take(end.saturating_sub(offset))
        .map(|(i, name)| {
            let parents: Vec<&str> = if i == 0 { Vec::new() } else { vec![DEFAULT_STAGES[i - 1]] };
            json!({"stageName": name, "parentStages": parents, "services": services})
        })
        .collect();
    let next_page_key = if end < DEFAULT_STAGES.len() { end.to_string() } else { "0".to_string() };

    Ok(Json(json!({
        "nextPageKey": next_page_key,
        "pageSize": stages.len(),
        "totalCount": DEFAULT_STAGES.len(),
        "stages": stages,
    })))
}
