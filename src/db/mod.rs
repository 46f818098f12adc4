pub mod role;
pub mod todo;
pub mod user;

use crate::config;

use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

pub use tokio_postgres::Error;

pub use self::{role::Role, todo::ToDo, user::User};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .dbname(&config.name)
        .user(&config.user)
        .password(&config.password)
        .application_name(&config.application_name);

    pg.connect(NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
}

pub struct Client(tokio_postgres::Client);
