//! Task queue and the netplay content locator task.
//!
//! [`TaskQueue`] runs tasks on worker threads and exposes their progress
//! through [`TaskHandle`]. [`submit_crc_scan`] pushes an exclusive task that
//! searches the playlist catalog for a checksum and, when a match is found,
//! readies a netplay session and loads the content with the requested core.

mod crc_scan;
mod dispatch;
mod queue;
mod status;

pub use crc_scan::*;
pub use dispatch::*;
pub use queue::*;
pub use status::*;
