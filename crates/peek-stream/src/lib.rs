//! # peek-stream
//!
//! Live fan-out from the ingest writer to subscribers.
//!
//! This crate provides:
//!
//! - [`Broadcaster`] — The subscriber registry; the only code that
//!   mutates it
//! - [`Subscription`] — A subscriber's bounded queue plus its cancel
//!   guard
//!
//! Every subscriber carries a compiled filter, an optional time window,
//! and a bounded queue. Publishing never blocks: a full queue drops the
//! record for that subscriber and moves on, so a stalled consumer cannot
//! stall ingest. For any one subscriber, delivered records arrive in
//! publish order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcaster;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription};
