//! Integration tests against an in-process backend

mod support;

mod test_deploy;
mod test_inject;
mod test_register;
mod test_schema_check;
mod test_upload;
mod test_watch;
