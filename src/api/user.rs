use serde::{Deserialize, Serialize};

pub use crate::db::user::Id;

/// Public projection of a user. The password hash never leaves the store
/// layer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub username: String,
    pub email: String,
}

/// Response of the form-encoded token flow.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

/// Response of the JSON sign-in flow.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Session {
    pub token: String,
    pub token_type: String,
}
