//! Core domain types and utilities for the caseflow workflow engine.
//!
//! This crate provides the foundational types shared by every other
//! caseflow crate: strongly-typed identifiers, the actor model for
//! transition attribution, and the error handling foundation.

pub mod actor;
pub mod error;
pub mod id;

pub use actor::{Actor, StepActor};
pub use error::Result;
pub use id::{InstanceId, ParseInstanceIdError};
