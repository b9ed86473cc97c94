//! `phaselog` - named phase timing with ordered records
//!
//! A [`PhaseTimer`] times one named span of work and carries an
//! [`OrderedRecord`] of caller data. A [`PhaseRegistry`] keeps phases in
//! registration order and converts to and from ordered maps and JSON.
//! [`PhaseObserver`] implementations receive every start and stop.
//!
//! ```
//! use phaselog::PhaseRegistry;
//!
//! let mut registry = PhaseRegistry::new();
//! let build = registry.add_new("build", true, None);
//! build.set("target", "release").unwrap();
//! build.stop(false).unwrap();
//!
//! let json = serde_json::to_string(&registry).unwrap();
//! let restored: PhaseRegistry = serde_json::from_str(&json).unwrap();
//! assert_eq!(restored, registry);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod record;
pub mod registry;

pub use error::{PhaseError, PhaselogError, RecordError};
pub use observability::PhaseObserver;
pub use phase::{PhaseId, PhaseScope, PhaseStatus, PhaseTimer};
pub use record::{OrderedRecord, RecordSeed};
pub use registry::PhaseRegistry;
