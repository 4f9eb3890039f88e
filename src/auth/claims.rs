use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Account role. Stored and transmitted as an integer; only `1` is admin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "i32", into = "i32")]
pub enum Role {
    #[default]
    Regular,
    Admin,
}

impl Role {
    const ADMIN_CODE: i32 = 1;
    const REGULAR_CODE: i32 = 0;
}

impl From<i32> for Role {
    fn from(code: i32) -> Self {
        if code == Role::ADMIN_CODE {
            Role::Admin
        } else {
            Role::Regular
        }
    }
}

impl From<Role> for i32 {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Role::ADMIN_CODE,
            Role::Regular => Role::REGULAR_CODE,
        }
    }
}

/// Who the bearer of a verified token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,  // user ID, decimal
    pub name: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,     // issued at (unix timestamp)
    pub exp: i64,     // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn identity(&self) -> Result<Identity, TokenError> {
        let user_id = self.sub.parse::<i64>().map_err(|_| TokenError::Malformed)?;
        Ok(Identity {
            user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        })
    }
}
