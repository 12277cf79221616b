//! API models

pub mod deployment;
pub mod iam;
pub mod messaging;
pub mod status;
pub mod storage;

pub use deployment::{
    DeploymentPayload, DeploymentRecord, DeploymentList, ServicePayload, ValidationErrorResponse,
};
pub use iam::{
    ApplicationList, ApplicationSummary, CreateApplicationRequest, IamApplication, RoleAssignment,
    StudioApplicationRequest, UserProfile,
};
pub use messaging::{CreateGrantRequest, Grant, GrantList, GrantRole};
pub use status::{FailureReason, ServiceStatus, StatusMap, StatusSnapshot};
pub use storage::{PresignRequest, PresignResponse, SchemaDocument};
