//! Deployment runs: upload, trigger and status watching

pub mod run;
pub mod schema_check;
pub mod sse;
pub mod status;
pub mod upload;
pub mod watch;
