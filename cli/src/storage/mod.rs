//! Local state: settings, credentials, project manifest

pub mod credentials;
pub mod layout;
pub mod manifest;
pub mod settings;
