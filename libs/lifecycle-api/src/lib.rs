//! Wire models for the CXP lifecycle backend
//!
//! Request and response bodies shared by the IAM, deployment orchestrator,
//! schema registry and messaging services.

pub mod models;
