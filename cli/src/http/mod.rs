//! HTTP clients for the platform backends

pub mod applications;
pub mod client;
pub mod deployments;
pub mod iam;
pub mod messaging;
pub mod retry;
pub mod schemas;
pub mod storage;
