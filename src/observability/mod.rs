//! Observability module
//!
//! Phase observers, logging, metrics and the structured event stream.

pub mod events;
pub mod logging;
pub mod metrics;
pub mod observer;

pub use events::{Event, EventEmitter, EventObserver};
pub use logging::{LogFormat, init_logging};
pub use self::metrics::{MetricsObserver, init_metrics};
pub use observer::{ObserverSet, PhaseObserver, TracingObserver};
