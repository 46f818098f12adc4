use serde::{Deserialize, Serialize};

pub use crate::db::todo::Id;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ToDo {
    pub id: Id,
    pub name: String,
    pub completed: bool,
}
