// Relational-DB Adapter
//
// A bb8 pool over tokio-postgres. The pool is sized so the worker fan-out can
// never starve: min = workers + 2, max = 2 * (workers + 2). A held pooled
// connection is one PostgreSQL session, which is what makes the session-scoped
// temp-table pattern in the search and morphology paths work.

pub mod workline;

use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::NoTls;
use tracing::debug;

pub use workline::{PrerolledQuery, Workline};

use crate::config::PostgresLogin;
use crate::error::Result;

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Build the shared connection pool and validate it by checking out one
/// connection. An unreachable database is a startup configuration error.
pub async fn connect_pool(login: &PostgresLogin, workers: usize) -> Result<PgPool> {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&login.host)
        .port(login.port)
        .user(&login.user)
        .dbname(&login.db_name);
    if !login.pass.is_empty() {
        config.password(&login.pass);
    }

    let manager = PostgresConnectionManager::new(config, NoTls);
    let min_connections = workers as u32 + 2;
    let pool = Pool::builder()
        .min_idle(Some(min_connections))
        .max_size(min_connections * 2)
        .build(manager)
        .await?;

    // one checkout up front so bad credentials fail here, not mid-search
    drop(pool.get().await?);
    debug!("Connected to {} on PostgreSQL", login.db_name);

    Ok(pool)
}
