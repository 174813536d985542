use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{CredentialsRequest, LoginResponse, PublicUser, RegisterResponse},
        errors::AuthError,
        jwt::AuthUser,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Unparseable bodies count as missing fields.
fn credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AuthError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!(error = %rejection, "rejected request body");
            Err(AuthError::Validation)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AuthError> {
    let body = credentials(payload)?;
    let registered = state
        .auth
        .register(body.email.as_deref(), body.password.as_deref())
        .await?;

    Ok(Json(RegisterResponse {
        success: true,
        user: PublicUser {
            email: registered.email,
            created_at: registered.created_at,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let body = credentials(payload)?;
    let logged_in = state
        .auth
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        token: logged_in.token,
        user: PublicUser {
            email: logged_in.email,
            created_at: logged_in.created_at,
        },
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.current_user(user_id).await?;
    Ok(Json(PublicUser {
        email: user.email,
        created_at: user.created_at,
    }))
}
