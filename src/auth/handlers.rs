use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, DeleteAccountRequest, LoginRequest, PublicUser,
            RegisterRequest, SessionResponse,
        },
        session::{Session, SessionKeys},
        store,
    },
    state::AppState,
};

/// Usernames are compared as typed minus surrounding whitespace, everywhere.
fn normalize_username(raw: &str) -> String {
    raw.trim().to_string()
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/password", put(change_password))
        .route("/auth/account", delete(delete_account))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    payload.username = normalize_username(&payload.username);

    if payload.username.is_empty() || payload.password.is_empty() {
        warn!("empty username or password");
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password are required".into(),
        ));
    }

    // Ensure username is not taken; the unique constraint backs this up.
    if let Ok(Some(_)) = store::find_user_id(&state.db, &payload.username).await {
        warn!(username = %payload.username, "username already registered");
        return Err((
            StatusCode::CONFLICT,
            "Username already registered".into(),
        ));
    }

    let user = match store::store(&state.db, &payload.username, &payload.password).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "store user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    payload.username = normalize_username(&payload.username);

    let ok = store::authenticate(&state.db, &payload.username, &payload.password)
        .await
        .map_err(|e| {
            error!(error = %e, "authenticate failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    if !ok {
        warn!(username = %payload.username, "login rejected");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let user_id = store::find_user_id(&state.db, &payload.username)
        .await
        .map_err(|e| {
            error!(error = %e, "find_user_id failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user_id).map_err(|e| {
        error!(error = %e, "session token sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id, username = %payload.username, "user logged in");
    Ok(Json(SessionResponse {
        token,
        user: PublicUser {
            id: user_id,
            username: payload.username,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    Json(mut payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(session_user) = session.user_id() else {
        warn!("anonymous password change rejected");
        return Err((StatusCode::UNAUTHORIZED, "Log in first".into()));
    };
    payload.username = normalize_username(&payload.username);

    // The session may only touch its own credentials.
    let owner = store::find_user_id(&state.db, &payload.username)
        .await
        .map_err(internal)?;
    if owner != Some(session_user) {
        warn!(username = %payload.username, session_user, "password change for foreign account rejected");
        return Err((StatusCode::FORBIDDEN, "Not your account".into()));
    }

    let ok = store::authenticate(&state.db, &payload.username, &payload.current_password)
        .await
        .map_err(internal)?;
    if !ok {
        warn!(username = %payload.username, "password change rejected");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let updated = store::update_password(&state.db, &payload.username, &payload.new_password)
        .await
        .map_err(internal)?;
    info!(username = %payload.username, updated, "password updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    Json(mut payload): Json<DeleteAccountRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(session_user) = session.user_id() else {
        warn!("anonymous account deletion rejected");
        return Err((StatusCode::UNAUTHORIZED, "Log in first".into()));
    };
    payload.username = normalize_username(&payload.username);

    // The session may only touch its own credentials.
    let owner = store::find_user_id(&state.db, &payload.username)
        .await
        .map_err(internal)?;
    if owner != Some(session_user) {
        warn!(username = %payload.username, session_user, "deletion of foreign account rejected");
        return Err((StatusCode::FORBIDDEN, "Not your account".into()));
    }

    let ok = store::authenticate(&state.db, &payload.username, &payload.password)
        .await
        .map_err(internal)?;
    if !ok {
        warn!(username = %payload.username, "account deletion rejected");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let deleted = store::delete(&state.db, &payload.username)
        .await
        .map_err(internal)?;
    info!(username = %payload.username, deleted, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "database operation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_response_serializes_token_and_user() {
        let response = SessionResponse {
            token: "abc.def.ghi".into(),
            user: PublicUser {
                id: 7,
                username: "alice".into(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("abc.def.ghi"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn username_normalization_trims_whitespace() {
        assert_eq!(normalize_username("  alice "), "alice");
        assert_eq!(normalize_username("alice"), "alice");
    }

    #[tokio::test]
    async fn change_password_gates_anonymous_sessions() {
        let state = AppState::fake();
        let payload = ChangePasswordRequest {
            username: "alice".into(),
            current_password: "pw1".into(),
            new_password: "pw2".into(),
        };
        let result = change_password(State(state), Session::Anonymous, Json(payload)).await;
        let (status, message) = result.err().expect("anonymous must be gated");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(message.contains("Log in"));
    }

    #[tokio::test]
    async fn delete_account_gates_anonymous_sessions() {
        let state = AppState::fake();
        let payload = DeleteAccountRequest {
            username: "alice".into(),
            password: "pw1".into(),
        };
        let result = delete_account(State(state), Session::Anonymous, Json(payload)).await;
        let (status, message) = result.err().expect("anonymous must be gated");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(message.contains("Log in"));
    }

    #[test]
    fn login_request_deserializes() {
        let payload: LoginRequest =
            serde_json::from_str(r#"{"username":" alice ","password":"pw1"}"#).unwrap();
        assert_eq!(payload.username, " alice ");
        assert_eq!(payload.password, "pw1");
    }
}
