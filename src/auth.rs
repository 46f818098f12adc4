use std::time::Duration;

use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::{Role, User};

#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues and verifies the signed bearer tokens.
///
/// Verification is stateless: it checks the signature and the expiry
/// claim only, never the store.
pub struct Tokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_time: Duration,
}

impl Tokens {
    pub fn new(secret: &str, expiration_time: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_time,
        }
    }

    pub fn issue(
        &self,
        subject: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let expires_at = OffsetDateTime::now_utc() + self.expiration_time;
        encode(
            &Header::default(),
            &Claims {
                sub: subject.to_string(),
                exp: expires_at.unix_timestamp(),
            },
            &self.encoding_key,
        )
    }

    pub fn verify(&self, token: &str) -> Result<String, InvalidToken> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|_| InvalidToken)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InvalidToken;

/// Allows a request through when the caller's assigned roles intersect
/// the gate's allowed set.
pub struct RoleGate {
    allowed: &'static [Role],
}

pub const ADMIN_ONLY: RoleGate = RoleGate {
    allowed: &[Role::Admin],
};

pub const MODERATOR_ONLY: RoleGate = RoleGate {
    allowed: &[Role::Moderator],
};

// Gates encode no hierarchy: every role that may pass is listed.
pub const ANY_USER: RoleGate = RoleGate {
    allowed: &[Role::User, Role::Moderator, Role::Admin],
};

#[derive(Clone, Copy, Debug)]
pub struct InsufficientRole;

impl RoleGate {
    pub fn check<'a>(
        &self,
        user: &'a User,
        assigned: &[Role],
    ) -> Result<&'a User, InsufficientRole> {
        if assigned.iter().any(|role| self.allowed.contains(role)) {
            Ok(user)
        } else {
            Err(InsufficientRole)
        }
    }
}
