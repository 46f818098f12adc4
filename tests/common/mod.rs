use constcat::concat;
use reqwest::StatusCode;
use serde_json::json;
use todo_backend::api;

const BASE_URL: &str = "http://localhost:3000";

// Tests expect the server on localhost:3000 and a database freshly
// initialized with `schema.sql`.
pub struct Client {
    inner: reqwest::Client,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
            auth_token: None,
        }
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<api::User, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/signup");

        Ok(self
            .inner
            .post(URL)
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::User>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn sign_in(mut self, username: &str, password: &str) -> Self {
        let session = self
            .try_sign_in(username, password)
            .await
            .expect("wrong status code");
        self.auth_token = Some(session.token);
        self
    }

    pub async fn try_sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<api::user::Session, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/signin");

        Ok(self
            .inner
            .post(URL)
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::user::Session>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<api::user::AccessToken, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/token");

        Ok(self
            .inner
            .post(URL)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::user::AccessToken>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn me(&self) -> Result<api::User, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/users/me");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::User>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn users(&self) -> Result<Vec<api::User>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/users");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::User>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn user(&self, username: &str) -> Result<api::User, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/api/auth/users");

        let mut req = self.inner.get(format!("{URL}/{username}"));
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::User>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn add_todo(
        &self,
        name: &str,
        completed: bool,
    ) -> Result<api::ToDo, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/todos");

        Ok(self
            .inner
            .post(URL)
            .json(&json!({
                "name": name,
                "completed": completed,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::ToDo>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn get_todo(
        &self,
        id: api::todo::Id,
    ) -> Result<api::ToDo, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/todos");

        Ok(self
            .inner
            .get(format!("{URL}/{id}"))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::ToDo>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn get_todos(
        &self,
        completed: Option<bool>,
    ) -> Result<Vec<api::ToDo>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/todos");

        let url = match completed {
            Some(completed) => format!("{URL}?completed={completed}"),
            None => URL.to_string(),
        };
        Ok(self
            .inner
            .get(url)
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::ToDo>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn edit_todo(
        &self,
        id: api::todo::Id,
        name: &str,
        completed: bool,
    ) -> Result<api::ToDo, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/todos");

        Ok(self
            .inner
            .put(format!("{URL}/{id}"))
            .json(&json!({
                "name": name,
                "completed": completed,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::ToDo>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn delete_todo(
        &self,
        id: api::todo::Id,
    ) -> Result<api::ToDo, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/todos");

        Ok(self
            .inner
            .delete(format!("{URL}/{id}"))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::ToDo>()
            .await
            .expect("failed to get a response"))
    }
}
