use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let ctx = state.op_ctx();
    let user = services::register(state.users.as_ref(), &ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let ctx = state.op_ctx();
    let logged = services::login(
        state.users.as_ref(),
        &state.jwt,
        &ctx,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok(Json(LoginResponse {
        message: "logged in",
        token: logged.token,
        user: logged.user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let ctx = state.op_ctx();
    let user = state
        .users
        .find_by_id(&ctx, identity.user_id)
        .await
        .map_err(|e| AppError::from_store(e, "User"))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_login_me_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        let app = || {
            Router::new()
                .merge(auth_routes())
                .merge(me_routes())
                .with_state(state.clone())
        };

        let (status, body) = send(
            app(),
            json_post(
                "/register",
                serde_json::json!({
                    "name": "Alice", "email": "a@x.com", "password": "pw123",
                    "gender": "F", "role": 1
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], 1);
        assert!(body.get("password_hash").is_none());

        let (status, body) = send(
            app(),
            json_post("/login", serde_json::json!({ "email": "a@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "logged in");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(
            app(),
            Request::get("/me")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = Router::new()
            .merge(auth_routes())
            .with_state(AppState::fake(dir.path()));

        let (status, body) = send(
            app,
            json_post("/login", serde_json::json!({ "email": "a@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
        assert_eq!(body["error"]["code"], "AUTH_002");
    }

    #[tokio::test]
    async fn requests_after_shutdown_are_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        state.shutdown.cancel();
        let app = Router::new().merge(auth_routes()).with_state(state);

        let (status, body) = send(
            app,
            json_post("/login", serde_json::json!({ "email": "a@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["error"]["code"], "CTX_001");
    }
}
