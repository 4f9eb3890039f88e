use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    auth::repo_types::{NewUser, User, UserRow},
    ctx::OpCtx,
    error::StoreError,
};

/// Credential store. Absence is `StoreError::NotFound`, never an internal error.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, ctx: &OpCtx, email: &str) -> Result<User, StoreError>;
    async fn find_by_id(&self, ctx: &OpCtx, id: i64) -> Result<User, StoreError>;
    /// Persists a user whose password is already hashed; returns the assigned id.
    async fn insert(&self, ctx: &OpCtx, user: NewUser) -> Result<i64, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, ctx: &OpCtx, email: &str) -> Result<User, StoreError> {
        ctx.run(async {
            let row = sqlx::query_as::<_, UserRow>(
                r#"
                SELECT user_id, name, email, password_hash, gender, role
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            row.map(User::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn find_by_id(&self, ctx: &OpCtx, id: i64) -> Result<User, StoreError> {
        ctx.run(async {
            let row = sqlx::query_as::<_, UserRow>(
                r#"
                SELECT user_id, name, email, password_hash, gender, role
                FROM users
                WHERE user_id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            row.map(User::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn insert(&self, ctx: &OpCtx, user: NewUser) -> Result<i64, StoreError> {
        ctx.run(async {
            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO users (name, email, password_hash, gender, role)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING user_id
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.gender)
            .bind(i32::from(user.role))
            .fetch_one(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            Ok(id)
        })
        .await
    }
}
