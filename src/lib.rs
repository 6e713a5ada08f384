//! Snowflake administration tools.
//!
//! - [agent_create]: create or replace agents through the REST API from JSON files
//! - [agent_sql]: render `CREATE OR REPLACE AGENT` DDL from agent descriptions
//! - [upload]: `PUT` a directory of files to a stage through the `snow` CLI
//! - [sql_runner]: run numbered `.sql` files through the `snow` CLI in order

pub use snowflake_rest;

pub mod agent_create;
pub mod agent_sql;
pub mod describe;
pub mod logging;
pub mod report;
pub mod snow;
pub mod sql_runner;
pub mod upload;
