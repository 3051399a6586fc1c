//! HTTP routes: players, leaderboard, room lifecycle, rounds, presence.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::room::manager::{RoomError, RoomManager};
use crate::room::model::{
    FoldOutcome, GameState, JoinOutcome, LeaderboardEntry, LeaveOutcome, PlayerProfile,
    RoomSummary, StartOutcome, SubmitOutcome, SweepReport,
};

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/users", post(register))
        .route("/api/users/:username", get(profile))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/rooms", post(create_room).get(list_rooms))
        .route("/api/rooms/:id", get(room))
        .route("/api/rooms/:id/join", post(join_room))
        .route("/api/rooms/:id/players/:username", delete(leave_room))
        .route("/api/rooms/:id/start", post(start_round))
        .route("/api/rooms/:id/submit", post(submit_answer))
        .route("/api/rooms/:id/fold", post(fold))
        .route("/api/rooms/:id/game", get(game_state))
        .route("/api/rooms/:id/heartbeat", post(heartbeat))
        .route("/api/sweep", post(sweep))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = match &self {
            RoomError::NotFound | RoomError::PlayerNotFound => StatusCode::NOT_FOUND,
            RoomError::NotOwner => StatusCode::FORBIDDEN,
            RoomError::InvalidName(_)
            | RoomError::InsufficientPlayers(_)
            | RoomError::NotMember
            | RoomError::Invalid(_) => StatusCode::BAD_REQUEST,
            RoomError::UsernameTaken
            | RoomError::Full
            | RoomError::GameInProgress
            | RoomError::AlreadyJoined
            | RoomError::NotPlaying
            | RoomError::AlreadyFolded
            | RoomError::AlreadySubmitted => StatusCode::CONFLICT,
            RoomError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = if self.is_operational() {
            tracing::error!(error = %self, "store failure");
            None
        } else {
            Some(self.to_string())
        };
        (status, Json(ErrorBody { error: self.reason(), detail })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, RoomError>;

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
pub struct PlayerBody {
    pub username: String,
}

async fn register(
    State(state): State<AppState>,
    Json(PlayerBody { username }): Json<PlayerBody>,
) -> Result<(StatusCode, Json<PlayerProfile>), RoomError> {
    let profile = state.rooms.register(&username).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn profile(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<PlayerProfile> {
    Ok(Json(state.rooms.profile(&username).await?))
}

async fn leaderboard(State(state): State<AppState>) -> ApiResult<Vec<LeaderboardEntry>> {
    Ok(Json(state.rooms.leaderboard().await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomBody {
    pub username: String,
    pub room_name: String,
}

async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<(StatusCode, Json<RoomSummary>), RoomError> {
    let room = state.rooms.create_room(&body.username, &body.room_name).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_rooms(State(state): State<AppState>) -> ApiResult<Vec<RoomSummary>> {
    Ok(Json(state.rooms.list_waiting().await?))
}

async fn room(Path(id): Path<String>, State(state): State<AppState>) -> ApiResult<RoomSummary> {
    Ok(Json(state.rooms.room(&id).await?))
}

async fn join_room(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(PlayerBody { username }): Json<PlayerBody>,
) -> ApiResult<JoinOutcome> {
    Ok(Json(state.rooms.join(&id, &username).await?))
}

async fn leave_room(
    Path((id, username)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<LeaveOutcome> {
    Ok(Json(state.rooms.leave(&id, &username).await?))
}

async fn start_round(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(PlayerBody { username }): Json<PlayerBody>,
) -> ApiResult<StartOutcome> {
    Ok(Json(state.rooms.start(&id, &username).await?))
}

#[derive(Deserialize)]
pub struct SubmitBody {
    pub username: String,
    pub expression: String,
}

async fn submit_answer(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<SubmitOutcome> {
    Ok(Json(state.rooms.submit(&id, &body.username, &body.expression).await?))
}

async fn fold(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(PlayerBody { username }): Json<PlayerBody>,
) -> ApiResult<FoldOutcome> {
    Ok(Json(state.rooms.fold(&id, &username).await?))
}

async fn game_state(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<GameState> {
    Ok(Json(state.rooms.game_state(&id).await?))
}

#[derive(Serialize)]
struct Ack {
    ok: bool,
}

async fn heartbeat(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(PlayerBody { username }): Json<PlayerBody>,
) -> ApiResult<Ack> {
    state.rooms.heartbeat(&id, &username).await?;
    let rooms = state.rooms.clone();
    tokio::spawn(async move {
        if let Err(e) = rooms.sweep_if_due().await {
            tracing::warn!(error = %e, "background sweep failed");
        }
    });
    Ok(Json(Ack { ok: true }))
}

async fn sweep(State(state): State<AppState>) -> ApiResult<SweepReport> {
    Ok(Json(state.rooms.sweep().await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::GameSettings;
    use crate::store::MemoryStore;

    fn test_app() -> Router {
        let rooms = RoomManager::new(Arc::new(MemoryStore::new()), GameSettings::default());
        router(AppState { rooms })
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let res = app.clone().oneshot(request).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, value)
    }

    /// POST `/api/rooms/{id}/{action}` on behalf of `username`.
    async fn act(app: &Router, id: &str, action: &str, username: &str) -> (StatusCode, Value) {
        let uri = format!("/api/rooms/{id}/{action}");
        call(app, Method::POST, &uri, Some(json!({ "username": username }))).await
    }

    async fn register(app: &Router, name: &str) {
        let (status, _) =
            call(app, Method::POST, "/api/users", Some(json!({ "username": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn health_check() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn players_register_once() {
        let app = test_app();
        register(&app, "alice").await;
        let (status, body) =
            call(&app, Method::POST, "/api/users", Some(json!({ "username": "alice" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "username_taken");

        let (status, body) = call(&app, Method::GET, "/api/users/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["games"], 0);

        let (status, body) = call(&app, Method::GET, "/api/users/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "player_not_found");
    }

    #[tokio::test]
    async fn room_flow_over_http() {
        let app = test_app();
        register(&app, "alice").await;
        register(&app, "bob").await;

        let (status, room) = call(
            &app,
            Method::POST,
            "/api/rooms",
            Some(json!({ "username": "alice", "roomName": "den" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(room["status"], "waiting");
        assert_eq!(room["maxPlayers"], 4);
        let id = room["id"].as_str().unwrap().to_string();

        let (status, body) = act(&app, &id, "start", "alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient_players");

        let (status, body) = act(&app, &id, "join", "bob").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["members"], json!(["alice", "bob"]));

        let (_, listed) = call(&app, Method::GET, "/api/rooms", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, body) = act(&app, &id, "start", "bob").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not_owner");

        let (status, started) = act(&app, &id, "start", "alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["round"], 1);
        assert_eq!(started["cards"].as_array().unwrap().len(), 4);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/rooms/{id}/submit"),
            Some(json!({ "username": "bob", "expression": "1+" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, _) = act(&app, &id, "fold", "alice").await;
        assert_eq!(status, StatusCode::OK);
        let (status, fold) = act(&app, &id, "fold", "bob").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fold["isDraw"], true);
        assert_eq!(fold["foldedCount"], 2);
        assert!(fold["hasAnswer"].is_boolean());

        let (status, game) = call(&app, Method::GET, &format!("/api/rooms/{id}/game"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(game["status"], "finished");
        assert_eq!(game["winner"], "draw");
        assert_eq!(game["solutionData"]["cards"], started["cards"]);

        let (status, body) = act(&app, &id, "fold", "bob").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "not_playing");

        let (status, _) = act(&app, &id, "heartbeat", "bob").await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/api/rooms/{id}/players/alice");
        let (status, left) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(left["roomDestroyed"], true);
        let (status, _) = call(&app, Method::GET, &format!("/api/rooms/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn manual_sweep_reports_counts() {
        let app = test_app();
        let (status, body) = call(&app, Method::POST, "/api/sweep", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "cleanedPlayers": 0, "cleanedRooms": 0 }));
    }
}
