#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

mod connector;
mod framed;

pub use connector::{connect_begin, connect_finalize, mark_as_upgraded, single_connect_step, ShouldUpgrade, Upgraded};
pub use framed::Framed;

use std::time::Duration;

/// Deadline for every transport read before the session is active.
pub const SETUP_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for transport writes.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);
