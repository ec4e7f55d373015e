#![forbid(unsafe_code)]

//! Race Dash (rdash): a live terminal dashboard for vehicle controller
//! parameters.
//!
//! A poller thread fetches a flat JSON array of parameter records from an HTTP
//! endpoint or a local file on a fixed interval. Each payload is reduced into a
//! value map plus three control signals (page, focus, auto-mode) that override
//! the dashboard's own navigation state:
//! 1. **Feed** ([`feed`]): sources, lenient payload decoding, the poll loop
//! 2. **Dashboard** (`tui`): Elm-style model/update/render on crossterm
//! 3. **Activity log** ([`logger`]): session and feed transitions as JSONL
//!
//! # Library usage
//!
//! ```rust,no_run
//! use race_dash::prelude::*;
//!
//! let snapshot = decode_payload(r#"[{"name":"TV_g","value":"11"},{"page":2}]"#)?;
//! assert_eq!(snapshot.page, Some(2));
//! # Ok::<(), DashError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod feed;
pub mod logger;
#[cfg(feature = "tui")]
pub mod tui;
