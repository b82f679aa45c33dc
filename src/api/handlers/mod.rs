pub mod health;
pub use self::health::health;

pub mod index;
pub mod session;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::users::{TIMESTAMP_FORMAT, User};

/// Public view of a [`User`]; the password hash is never rendered.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: user.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
