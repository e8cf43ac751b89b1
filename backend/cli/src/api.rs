use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use adkit_agent::{Agent, Runner};
use adkit_core::{AdkError, ToolRegistry};

/// Shared application state for API handlers.
pub struct AppState {
    pub runner: Runner,
    pub tools: ToolRegistry,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/tools", get(list_tools))
        .route(
            "/api/users/:user/sessions",
            get(list_sessions).post(create_session),
        )
        .route(
            "/api/users/:user/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route(
            "/api/users/:user/sessions/:id/run",
            axum::routing::post(run_agent),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn status_for(err: &AdkError) -> StatusCode {
    match err {
        AdkError::SessionNotFound { .. } | AdkError::AgentNotFound(_) => StatusCode::NOT_FOUND,
        AdkError::SessionExists(_) => StatusCode::CONFLICT,
        AdkError::InvalidSessionKey(_) | AdkError::Template(_) => StatusCode::BAD_REQUEST,
        AdkError::LlmError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: AdkError) -> (StatusCode, Json<Value>) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "API request failed");
    }
    (status, Json(json!({ "error": err.to_string() })))
}

fn agent_json(agent: &Arc<dyn Agent>) -> Value {
    json!({
        "name": agent.name(),
        "description": agent.description(),
        "subAgents": agent.sub_agents().iter().map(agent_json).collect::<Vec<_>>(),
    })
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "adkit",
        "app": state.runner.app_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "root": agent_json(state.runner.agent()) }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "tools": state.tools.declarations() }))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> ApiResult {
    let sessions = state
        .runner
        .sessions()
        .list_sessions(state.runner.app_name(), &user)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({ "sessions": sessions })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody {
    session_id: Option<String>,
    #[serde(default)]
    state: Map<String, Value>,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    body: Option<Json<CreateSessionBody>>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session = state
        .runner
        .sessions()
        .create_session(
            state.runner.app_name(),
            &user,
            body.session_id.as_deref(),
            body.state,
        )
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(json!(session))))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, String)>,
) -> ApiResult {
    let app = state.runner.app_name();
    let session = state
        .runner
        .sessions()
        .get_session(app, &user, &id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| api_error(AdkError::session_not_found(app, &user, &id)))?;
    Ok(Json(json!(session)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, String)>,
) -> ApiResult {
    state
        .runner
        .sessions()
        .delete_session(state.runner.app_name(), &user, &id)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

#[derive(Debug, Deserialize)]
struct RunBody {
    message: String,
}

/// Run the root agent on one user message. The session is created on first use.
async fn run_agent(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, String)>,
    Json(body): Json<RunBody>,
) -> ApiResult {
    state
        .runner
        .sessions()
        .get_or_create_session(state.runner.app_name(), &user, &id)
        .await
        .map_err(api_error)?;
    let outcome = state
        .runner
        .run(&user, &id, &body.message)
        .await
        .map_err(api_error)?;
    Ok(Json(json!(outcome)))
}
