//! Parameter feed: sources, payload decoding, and the background poller.

pub mod poller;
pub mod record;
pub mod source;
