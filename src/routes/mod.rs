//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one game per connection)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/games", post(http::http_create_game))
        .route("/api/v1/games/:id", get(http::http_get_game))
        .route("/api/v1/games/:id/commands", post(http::http_post_command))
        .route("/api/v1/leaderboard", get(http::http_get_leaderboard))
        .route("/api/v1/theory", get(http::http_get_theory))
        .route("/api/v1/diagram", get(http::http_get_diagram))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::leaderboard::memory::MemoryStore;
    use crate::state::test_support::offline_state;

    async fn call(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn new_game(app: &Router) -> String {
        let res = call(app, Request::post("/api/v1/games").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["state"]["screen"], "home");
        body["game_id"].as_str().unwrap().to_string()
    }

    async fn command(app: &Router, id: &str, cmd: Value) -> Response {
        call(app, post_json(&format!("/api/v1/games/{id}/commands"), cmd)).await
    }

    #[tokio::test]
    async fn health_reports_generation_off() {
        let app = build_router(offline_state(MemoryStore::default()));
        let res = call(&app, Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body, json!({ "ok": true, "question_generation": false }));
    }

    #[tokio::test]
    async fn play_one_answer_over_http() {
        let app = build_router(offline_state(MemoryStore::default()));
        let id = new_game(&app).await;

        let res = command(&app, &id, json!({ "type": "request_start" })).await;
        assert_eq!(body_json(res).await["screen"], "name_input");

        let res = command(&app, &id, json!({ "type": "submit_name", "name": "  Lan " })).await;
        let view = body_json(res).await;
        assert_eq!(view["screen"], "playing");
        assert_eq!(view["player_name"], "Lan");
        assert!(view["question"]["correct_option"].is_null());

        let res = command(&app, &id, json!({ "type": "submit_answer", "option_index": 1 })).await;
        assert_eq!(res.status(), StatusCode::OK);
        let view = body_json(res).await;
        assert_eq!(view["score"], 10);
        assert_eq!(view["lives"], 3);
        assert_eq!(view["question"]["correct_option"], 1);

        let res = call(&app, Request::get(format!("/api/v1/games/{id}")).body(Body::empty()).unwrap()).await;
        assert_eq!(body_json(res).await["score"], 10);
    }

    #[tokio::test]
    async fn command_errors_map_to_status_codes() {
        let app = build_router(offline_state(MemoryStore::default()));
        let id = new_game(&app).await;

        let res = command(&app, &id, json!({ "type": "advance" })).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(body_json(res).await["message"].as_str().unwrap().contains("advance"));

        command(&app, &id, json!({ "type": "request_start" })).await;
        let res = command(&app, &id, json!({ "type": "submit_name", "name": "   " })).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let missing = uuid::Uuid::new_v4();
        let res = call(&app, Request::get(format!("/api/v1/games/{missing}")).body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn diagram_is_svg() {
        let app = build_router(offline_state(MemoryStore::default()));
        let req = Request::get("/api/v1/diagram?base=12&midsegment=6&labels=P,Q,R,E,F")
            .body(Body::empty())
            .unwrap();
        let res = call(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">12cm</text>"));
        assert!(svg.contains(">E</text>"));
    }

    #[tokio::test]
    async fn leaderboard_and_theory_are_served() {
        let app = build_router(offline_state(MemoryStore::default()));
        let res = call(&app, Request::get("/api/v1/leaderboard").body(Body::empty()).unwrap()).await;
        assert_eq!(body_json(res).await, json!({ "entries": [] }));

        let res = call(&app, Request::get("/api/v1/theory").body(Body::empty()).unwrap()).await;
        let body = body_json(res).await;
        assert_eq!(body["sections"].as_array().unwrap().len(), 3);
        assert!(!body["diagram_svg"].as_str().unwrap().contains("cm</text>"));
    }
}
