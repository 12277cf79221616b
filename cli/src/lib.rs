//! Lifecycle platform CLI library
//!
//! Project scaffolding, application registration, bundle uploads and
//! deployment status watching for the `cx-cli` binary.

pub mod app;
pub mod commands;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod inject;
pub mod logs;
pub mod register;
pub mod scaffold;
pub mod storage;
pub mod utils;
