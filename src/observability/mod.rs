//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder / Exchange produce lifecycle events:
//!     → observer.rs (hook slots, panic isolation, fan-out)
//!         → LogObserver (one tracing line per event)
//!         → metrics.rs MetricsObserver (counters)
//!
//! Process setup:
//!     → logging.rs (tracing subscriber)
//!     → metrics.rs (optional Prometheus endpoint)
//! ```

pub mod logging;
pub mod metrics;
pub mod observer;

pub use self::metrics::MetricsObserver;
pub use observer::{notify, ExchangeObserver, LogObserver, ObserverEvent, ObserverSet};
