//! Phase timers
//!
//! A phase is a named span of work with start/stop timing and an ordered
//! record of caller data.
//!
//! # Architecture
//!
//! - [`PhaseTimer`] - Start/stop state machine over an [`OrderedRecord`](crate::record::OrderedRecord)
//! - [`PhaseScope`] - Guard that stops a phase on every exit path
//! - [`codec`] - Flattening to and rebuilding from ordered records

pub mod codec;
pub mod id;
pub mod scope;
pub mod timer;

pub use id::PhaseId;
pub use scope::PhaseScope;
pub use timer::{
    ELAPSED_FIELD, END_TIME_FIELD, ID_FIELD, PhaseStatus, PhaseTimer, RESERVED_FIELDS,
    START_TIME_FIELD, is_reserved,
};
