use std::error::Error as StdError;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use super::Client;

#[derive(Clone, Debug)]
pub struct ToDo {
    pub id: Id,
    pub name: String,
    pub completed: bool,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq,
    Serialize,
)]
pub struct Id(i32);

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl FromSql<'_> for Id {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT4);

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
    pub async fn add_todo(
        &self,
        name: &str,
        completed: bool,
    ) -> Result<ToDo, Error> {
        const SQL: &str = "\
            INSERT INTO todos (name, completed) \
            VALUES ($1, $2) \
            RETURNING id, name, completed";
        self.0
            .query_one(SQL, &[&name, &completed])
            .await
            .map(|row| ToDo {
                id: row.get("id"),
                name: row.get("name"),
                completed: row.get("completed"),
            })
    }

    pub async fn get_todo_by_id(
        &self,
        id: Id,
    ) -> Result<Option<ToDo>, Error> {
        const SQL: &str = "SELECT id, name, completed \
                           FROM todos \
                           WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(|row| ToDo {
            id: row.get("id"),
            name: row.get("name"),
            completed: row.get("completed"),
        }))
    }

    pub async fn get_todos(
        &self,
        completed: Option<bool>,
    ) -> Result<Vec<ToDo>, Error> {
        const SQL: &str = "SELECT id, name, completed \
                           FROM todos \
                           WHERE $1::BOOL IS NULL OR completed = $1 \
                           ORDER BY id";
        Ok(self
            .0
            .query(SQL, &[&completed])
            .await?
            .into_iter()
            .map(|row| ToDo {
                id: row.get("id"),
                name: row.get("name"),
                completed: row.get("completed"),
            })
            .collect())
    }

    /// Full replace of `name` and `completed`. `None` if no such row.
    pub async fn update_todo(
        &self,
        id: Id,
        name: &str,
        completed: bool,
    ) -> Result<Option<ToDo>, Error> {
        const SQL: &str = "\
            UPDATE todos \
            SET name = $2, completed = $3 \
            WHERE id = $1 \
            RETURNING id, name, completed";
        Ok(self
            .0
            .query_opt(SQL, &[&id, &name, &completed])
            .await?
            .map(|row| ToDo {
                id: row.get("id"),
                name: row.get("name"),
                completed: row.get("completed"),
            }))
    }

    pub async fn delete_todo(&self, id: Id) -> Result<Option<ToDo>, Error> {
        const SQL: &str = "\
            DELETE FROM todos \
            WHERE id = $1 \
            RETURNING id, name, completed";
        Ok(self
            .0
            .query_opt(SQL, &[&id])
            .await?
            .map(|row| ToDo {
                id: row.get("id"),
                name: row.get("name"),
                completed: row.get("completed"),
            }))
    }
}
