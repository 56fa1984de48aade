use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{auth::session::Session, records, records::Record, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/document", get(document))
        .route("/streamer", get(streamer))
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub title: &'static str,
    pub login_hint: &'static str,
    pub contact: &'static str,
}

/// Static welcome view; login itself lives on the auth routes.
async fn home() -> Json<HomePage> {
    Json(HomePage {
        title: "Welcome to the ilssak dashboard!",
        login_hint: "Log in via POST /auth/login to use the streamer page",
        contact: "1041489@gmail.com",
    })
}

#[instrument(skip(state))]
async fn document(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = tokio::fs::read_to_string(&state.config.document_path)
        .await
        .map_err(|e| {
            error!(error = %e, path = %state.config.document_path, "document read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Document unavailable".to_string())
        })?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        body,
    ))
}

/// The three record tabs for one streamer.
#[derive(Debug, Serialize)]
pub struct StreamerPage {
    pub paipu: Vec<Record>,
    pub schedule: Vec<Record>,
    pub questions: Vec<Record>,
}

#[instrument(skip(state))]
async fn streamer(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StreamerPage>, (StatusCode, String)> {
    let Some(user_id) = session.user_id() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Log in to see the streamer page".into(),
        ));
    };

    let paipu = records::list_paipu(&state.db, user_id)
        .await
        .map_err(internal)?;
    let schedule = records::list_schedule(&state.db, user_id)
        .await
        .map_err(internal)?;
    let questions = records::list_questions(&state.db, user_id)
        .await
        .map_err(internal)?;

    Ok(Json(StreamerPage {
        paipu,
        schedule,
        questions,
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "record lookup failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn home_is_static_and_names_the_login_route() {
        let Json(page) = home().await;
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("Welcome"));
        assert!(json.contains("/auth/login"));
    }

    #[tokio::test]
    async fn streamer_gates_anonymous_sessions() {
        let state = AppState::fake();
        let result = streamer(State(state), Session::Anonymous).await;
        let (status, message) = result.err().expect("anonymous must be gated");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(message.contains("Log in"));
    }

    #[test]
    fn empty_record_sets_serialize_as_empty_arrays() {
        let page = StreamerPage {
            paipu: vec![],
            schedule: vec![],
            questions: vec![],
        };
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(json, r#"{"paipu":[],"schedule":[],"questions":[]}"#);
    }
}
