pub mod connection;
pub mod query_executor;

pub use connection::{close_connection, DbConnector, SqlDialect};
pub use query_executor::QueryExecutor;
