//! MySQL/MariaDB connection provider

mod connection;
mod schema;

pub use connection::{MySqlConnection, value_to_mysql_literal};
