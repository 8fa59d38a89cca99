#![allow(unused_crate_dependencies)]

#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/editing_flow.rs"]
mod editing_flow;

#[path = "integration/configured_session.rs"]
mod configured_session;
