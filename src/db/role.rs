use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use super::{user, Client};

/// Fixed role set seeded into the `roles` table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_MODERATOR")]
    Moderator,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Moderator => "ROLE_MODERATOR",
            Self::Admin => "ROLE_ADMIN",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ROLE_USER" => Some(Self::User),
            "ROLE_MODERATOR" => Some(Self::Moderator),
            "ROLE_ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl FromSql<'_> for Role {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let name = String::from_sql(ty, raw)?;
        Self::from_name(&name).ok_or_else(|| "invalid role".into())
    }
}

impl ToSql for Role {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }
}

impl Client {
    pub async fn get_role_id(
        &self,
        role: Role,
    ) -> Result<Option<i16>, Error> {
        const SQL: &str = "SELECT id FROM roles WHERE name = $1 LIMIT 1";
        Ok(self
            .0
            .query_opt(SQL, &[&role])
            .await?
            .map(|row| row.get("id")))
    }

    pub async fn get_user_roles(
        &self,
        user_id: user::Id,
    ) -> Result<Vec<Role>, Error> {
        const SQL: &str = "SELECT r.name \
                           FROM users_to_roles ur \
                           JOIN roles r ON r.id = ur.role_id \
                           WHERE ur.user_id = $1";
        Ok(self
            .0
            .query(SQL, &[&user_id])
            .await?
            .into_iter()
            .map(|row| row.get("name"))
            .collect())
    }
}
