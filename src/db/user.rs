use std::error::Error as StdError;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
    Argon2,
};
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};
use uuid::Uuid;

use super::Client;

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromSql<'_> for Id {
    accepts!(UUID);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Uuid::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(UUID);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

/// Salted Argon2id digest in PHC string format.
#[derive(Clone, Debug)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Result<Self, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
    }

    pub fn verify(&self, secret: &str) -> bool {
        argon2::password_hash::PasswordHash::new(&self.0)
            .map(|hash| {
                Argon2::default()
                    .verify_password(secret.as_bytes(), &hash)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

impl Client {
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, Error> {
        const SQL: &str = "SELECT id, username, email, password \
                           FROM users \
                           WHERE username = $1 \
                           LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&username]).await?.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password"),
        }))
    }

    pub async fn get_users(&self) -> Result<Vec<User>, Error> {
        const SQL: &str = "SELECT id, username, email, password \
                           FROM users \
                           ORDER BY username";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(|row| User {
                id: row.get("id"),
                username: row.get("username"),
                email: row.get("email"),
                password_hash: row.get("password"),
            })
            .collect())
    }

    /// Inserts the user together with its role assignment.
    ///
    /// Single statement, so either both rows commit or neither does.
    pub async fn create_user(
        &self,
        user: &User,
        role_id: i16,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            WITH new_user AS ( \
                INSERT INTO users (id, username, email, password) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id \
            ) \
            INSERT INTO users_to_roles (user_id, role_id) \
            SELECT id, $5 FROM new_user";

        self.0
            .execute(
                SQL,
                &[
                    &user.id,
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &role_id,
                ],
            )
            .await
            .map(drop)
    }
}
