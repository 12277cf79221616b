//! Local project scaffolding

pub mod init;
