//! The three-stage diagnostic pipeline.
//!
//! `session` holds the transient state, `orchestrator` drives the stages
//! against the remote services, and `view` renders a session into a
//! front-end neutral view-model.

pub mod orchestrator;
pub mod session;
pub mod view;

pub use orchestrator::*;
pub use session::*;
pub use view::*;
