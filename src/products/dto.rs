use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `?id=` query. Kept as a raw string so a bad value is reported only after
/// the caller has been authorized.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn parse(&self) -> Result<i64, AppError> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("invalid parameter: id is required".into()))?
            .parse::<i64>()
            .map_err(|_| AppError::Validation("invalid parameter: id must be an integer".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedProductResponse {
    pub id: i64,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
