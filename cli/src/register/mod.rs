//! Application registration with IAM and the developer studio

pub mod flow;
