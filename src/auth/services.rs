use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    ctx::OpCtx,
    error::{AppError, StoreError},
};

/// A user that passed credential checks, with a freshly issued token.
#[derive(Debug)]
pub struct LoggedIn {
    pub user: User,
    pub token: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Unknown email and wrong password produce the same `InvalidCredentials`.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    ctx: &OpCtx,
    email: &str,
    password: &str,
) -> Result<LoggedIn, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("invalid email".into()));
    }

    let user = match users.find_by_email(ctx, &email).await {
        Ok(u) => u,
        Err(StoreError::NotFound) => {
            verify_dummy(password);
            warn!(%email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(AppError::from_store(e, "User")),
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(&user.identity()).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        AppError::Internal(e.to_string())
    })?;

    info!(user_id = user.id, "user logged in");
    Ok(LoggedIn { user, token })
}

pub async fn register(
    users: &dyn UserStore,
    ctx: &OpCtx,
    req: RegisterRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }

    // Ensure email is not taken; the unique index still catches races.
    match users.find_by_email(ctx, &email).await {
        Ok(_) => {
            warn!(%email, "email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(AppError::from_store(e, "User")),
    }

    let password_hash = hash_password(&req.password)?;
    let new_user = NewUser {
        name,
        email,
        password_hash,
        gender: req.gender.trim().to_string(),
        role: req.role,
    };

    let id = users
        .insert(ctx, new_user.clone())
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::Conflict("email already registered".into()),
            other => AppError::from_store(other, "User"),
        })?;

    info!(user_id = id, role = ?new_user.role, "user registered");
    Ok(User {
        id,
        name: new_user.name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        gender: new_user.gender,
        role: new_user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{claims::Role, repo::memory::MemoryUserStore},
        config::JwtConfig,
    };

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        })
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            email: "a@x.com".into(),
            password: "pw123".into(),
            gender: "F".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign.com"));
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }

    #[tokio::test]
    async fn register_then_login_issues_verifiable_token() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let ctx = OpCtx::default();

        let registered = register(&users, &ctx, alice()).await.expect("register");
        assert_ne!(registered.password_hash, "pw123");

        let logged = login(&users, &keys, &ctx, "a@x.com", "pw123")
            .await
            .expect("login");
        assert_eq!(logged.user.role, Role::Admin);

        let claims = keys.verify(&logged.token).expect("token verifies");
        let identity = claims.identity().unwrap();
        assert_eq!(identity.user_id, registered.id);
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.role, Role::Admin);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let ctx = OpCtx::default();
        register(&users, &ctx, alice()).await.unwrap();

        let wrong = login(&users, &keys, &ctx, "a@x.com", "nope").await.unwrap_err();
        let unknown = login(&users, &keys, &ctx, "z@x.com", "pw123").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let users = MemoryUserStore::default();
        let ctx = OpCtx::default();
        register(&users, &ctx, alice()).await.unwrap();

        let mut again = alice();
        again.email = " A@X.COM".into();
        let err = register(&users, &ctx, again).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let users = MemoryUserStore::default();
        let ctx = OpCtx::default();

        let mut bad_email = alice();
        bad_email.email = "nope".into();
        assert!(matches!(
            register(&users, &ctx, bad_email).await,
            Err(AppError::Validation(_))
        ));

        let mut no_password = alice();
        no_password.password = String::new();
        assert!(matches!(
            register(&users, &ctx, no_password).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_login_is_not_an_auth_failure() {
        let users = MemoryUserStore::default();
        let ctx = OpCtx::default();
        register(&users, &ctx, alice()).await.unwrap();

        let cancelled = OpCtx::default();
        cancelled.cancel();
        let err = login(&users, &keys(), &cancelled, "a@x.com", "pw123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
    }
}
