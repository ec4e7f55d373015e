//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use race_dash::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, ParameterDescriptor, TabConfig};
pub use crate::core::errors::{DashError, Result};

// Feed
pub use crate::feed::poller::{PollOutcome, PollerHandle, poll_once, spawn_poller};
pub use crate::feed::record::{ParamValue, ParameterRecord, PayloadSnapshot, ValueMap, decode_payload};
pub use crate::feed::source::{FeedSource, FileSource, HttpSource, open_source};

// Logger
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
