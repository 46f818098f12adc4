use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        request, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use serde::Deserialize;
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use todo_backend::{api, auth, db, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let app = Router::new()
        .route("/todos", get(list_todos).post(add_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(edit_todo).delete(delete_todo),
        )
        .route("/api/auth/token", post(issue_token))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/users", get(list_users))
        .route("/api/auth/users/me", get(get_me))
        .route("/api/auth/users/:username", get(get_user))
        .layer(cors)
        .with_state(Arc::new(AppState {
            db_client,
            tokens: auth::Tokens::new(
                &config.jwt.secret,
                config.jwt.expiration_time,
            ),
        }));

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct AddToDoInput {
    name: String,
    #[serde(default)]
    completed: bool,
}

async fn add_todo(
    State(state): State<SharedAppState>,
    Json(AddToDoInput { name, completed }): Json<AddToDoInput>,
) -> Result<(StatusCode, Json<api::ToDo>), AddToDoError> {
    let todo = state.db_client.add_todo(&name, completed).await?;

    Ok((
        StatusCode::CREATED,
        Json(api::ToDo {
            id: todo.id,
            name: todo.name,
            completed: todo.completed,
        }),
    ))
}

#[derive(Debug, From)]
pub enum AddToDoError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for AddToDoError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
        .into_response()
    }
}

#[derive(Deserialize)]
struct ListToDosInput {
    completed: Option<bool>,
}

async fn list_todos(
    State(state): State<SharedAppState>,
    Query(ListToDosInput { completed }): Query<ListToDosInput>,
) -> Result<Json<Vec<api::ToDo>>, ListToDosError> {
    let todos = state.db_client.get_todos(completed).await?;

    Ok(Json(
        todos
            .into_iter()
            .map(|todo| api::ToDo {
                id: todo.id,
                name: todo.name,
                completed: todo.completed,
            })
            .collect(),
    ))
}

#[derive(Debug, From)]
pub enum ListToDosError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ListToDosError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
        .into_response()
    }
}

async fn get_todo(
    State(state): State<SharedAppState>,
    Path(id): Path<api::todo::Id>,
) -> Result<Json<api::ToDo>, GetToDoError> {
    use GetToDoError as E;

    let todo = state
        .db_client
        .get_todo_by_id(id)
        .await?
        .ok_or(E::ToDoNotFound)?;

    Ok(Json(api::ToDo {
        id: todo.id,
        name: todo.name,
        completed: todo.completed,
    }))
}

#[derive(Debug, From)]
pub enum GetToDoError {
    #[from]
    DbError(db::Error),
    ToDoNotFound,
}

impl IntoResponse for GetToDoError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::ToDoNotFound => {
                (StatusCode::NOT_FOUND, "to do not found").into_response()
            }
        }
    }
}

#[derive(Deserialize)]
struct EditToDoInput {
    name: String,
    completed: bool,
}

async fn edit_todo(
    State(state): State<SharedAppState>,
    Path(id): Path<api::todo::Id>,
    Json(EditToDoInput { name, completed }): Json<EditToDoInput>,
) -> Result<Json<api::ToDo>, EditToDoError> {
    use EditToDoError as E;

    let todo = state
        .db_client
        .update_todo(id, &name, completed)
        .await?
        .ok_or(E::ToDoNotFound)?;

    Ok(Json(api::ToDo {
        id: todo.id,
        name: todo.name,
        completed: todo.completed,
    }))
}

#[derive(Debug, From)]
pub enum EditToDoError {
    #[from]
    DbError(db::Error),
    ToDoNotFound,
}

impl IntoResponse for EditToDoError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::ToDoNotFound => {
                (StatusCode::NOT_FOUND, "to do not found").into_response()
            }
        }
    }
}

async fn delete_todo(
    State(state): State<SharedAppState>,
    Path(id): Path<api::todo::Id>,
) -> Result<Json<api::ToDo>, DeleteToDoError> {
    use DeleteToDoError as E;

    let todo = state
        .db_client
        .delete_todo(id)
        .await?
        .ok_or(E::ToDoNotFound)?;

    Ok(Json(api::ToDo {
        id: todo.id,
        name: todo.name,
        completed: todo.completed,
    }))
}

#[derive(Debug, From)]
pub enum DeleteToDoError {
    #[from]
    DbError(db::Error),
    ToDoNotFound,
}

impl IntoResponse for DeleteToDoError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::ToDoNotFound => {
                (StatusCode::NOT_FOUND, "to do not found").into_response()
            }
        }
    }
}

/// Looks up the user and checks the password in one step, so unknown
/// usernames and wrong passwords are indistinguishable to the caller.
async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<db::User, AuthError> {
    state
        .db_client
        .get_user_by_username(username)
        .await?
        .filter(|user| user.password_hash.verify(password))
        .ok_or(AuthError::InvalidCredentials)
}

#[derive(Deserialize)]
struct TokenInput {
    username: String,
    password: String,
}

async fn issue_token(
    State(state): State<SharedAppState>,
    Form(TokenInput { username, password }): Form<TokenInput>,
) -> Result<Json<api::user::AccessToken>, AuthError> {
    use AuthError as E;

    let user = authenticate(&state, &username, &password).await?;
    let token = state
        .tokens
        .issue(&user.username)
        .map_err(|_| E::InvalidToken)?;

    Ok(Json(api::user::AccessToken {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

#[derive(Deserialize)]
struct SignInInput {
    username: String,
    password: String,
}

async fn sign_in(
    State(state): State<SharedAppState>,
    Json(SignInInput { username, password }): Json<SignInInput>,
) -> Result<Json<api::user::Session>, AuthError> {
    use AuthError as E;

    let user = authenticate(&state, &username, &password).await?;
    let token = state
        .tokens
        .issue(&user.username)
        .map_err(|_| E::InvalidToken)?;

    Ok(Json(api::user::Session {
        token,
        token_type: "bearer".to_string(),
    }))
}

#[derive(Debug, From)]
pub enum AuthError {
    #[from]
    DbError(db::Error),
    InvalidCredentials,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::InvalidCredentials => {
                unauthorized("incorrect username or password")
            }
            Self::InvalidToken => {
                unauthorized("could not validate credentials")
            }
        }
    }
}

fn unauthorized(detail: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        detail,
    )
        .into_response()
}

#[derive(Deserialize)]
struct SignUpInput {
    username: String,
    email: String,
    password: String,
}

async fn sign_up(
    State(state): State<SharedAppState>,
    Json(SignUpInput {
        username,
        email,
        password,
    }): Json<SignUpInput>,
) -> Result<Json<api::User>, SignUpError> {
    use SignUpError as E;

    // Roles are seed data and must exist before the first sign-up.
    let role_id = state
        .db_client
        .get_role_id(db::Role::User)
        .await?
        .ok_or(E::MissingDefaultRole)?;

    let user = db::User {
        id: db::user::Id::new(),
        username,
        email,
        password_hash: db::user::PasswordHash::new(&password)?,
    };
    state.db_client.create_user(&user, role_id).await?;

    Ok(Json(api::User {
        username: user.username,
        email: user.email,
    }))
}

#[derive(Debug, From)]
pub enum SignUpError {
    #[from]
    DbError(db::Error),
    #[from]
    PasswordHash(argon2::password_hash::Error),
    MissingDefaultRole,
}

impl IntoResponse for SignUpError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) | Self::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::MissingDefaultRole => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "default role is not seeded",
            )
                .into_response(),
        }
    }
}

async fn get_me(
    State(state): State<SharedAppState>,
    AuthUser(subject): AuthUser,
) -> Result<Json<api::User>, GetUserError> {
    use GetUserError as E;

    let my = state
        .db_client
        .get_user_by_username(&subject)
        .await?
        .ok_or(E::UnknownSubject)?;
    let roles = state.db_client.get_user_roles(my.id).await?;
    let my = auth::ANY_USER.check(&my, &roles)?;

    Ok(Json(api::User {
        username: my.username.clone(),
        email: my.email.clone(),
    }))
}

async fn list_users(
    State(state): State<SharedAppState>,
    AuthUser(subject): AuthUser,
) -> Result<Json<Vec<api::User>>, GetUserError> {
    use GetUserError as E;

    let my = state
        .db_client
        .get_user_by_username(&subject)
        .await?
        .ok_or(E::UnknownSubject)?;
    let roles = state.db_client.get_user_roles(my.id).await?;
    auth::ADMIN_ONLY.check(&my, &roles)?;

    let users = state.db_client.get_users().await?;

    Ok(Json(
        users
            .into_iter()
            .map(|user| api::User {
                username: user.username,
                email: user.email,
            })
            .collect(),
    ))
}

async fn get_user(
    State(state): State<SharedAppState>,
    AuthUser(subject): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<api::User>, GetUserError> {
    use GetUserError as E;

    let my = state
        .db_client
        .get_user_by_username(&subject)
        .await?
        .ok_or(E::UnknownSubject)?;
    let roles = state.db_client.get_user_roles(my.id).await?;
    auth::MODERATOR_ONLY.check(&my, &roles)?;

    let user = state
        .db_client
        .get_user_by_username(&username)
        .await?
        .ok_or(E::UserNotFound)?;

    Ok(Json(api::User {
        username: user.username,
        email: user.email,
    }))
}

#[derive(Debug, From)]
pub enum GetUserError {
    #[from]
    DbError(db::Error),
    #[from]
    InsufficientRole(auth::InsufficientRole),
    UnknownSubject,
    UserNotFound,
}

impl IntoResponse for GetUserError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::InsufficientRole(_) => {
                (StatusCode::FORBIDDEN, "operation not permitted")
                    .into_response()
            }
            Self::UnknownSubject => {
                unauthorized("could not validate credentials")
            }
            Self::UserNotFound => {
                (StatusCode::NOT_FOUND, "user not found").into_response()
            }
        }
    }
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: db::Client,

    tokens: auth::Tokens,
}

/// Verified subject of the request's bearer token.
struct AuthUser(String);

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let subject = state
            .tokens
            .verify(bearer.token())
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(Self(subject))
    }
}
