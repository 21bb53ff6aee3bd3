//! Persistent playlist catalog and core registry used by the Arcadia frontend.

mod catalog;
mod checksum;
mod cores;
mod entry;
mod store_json;

pub use catalog::*;
pub use checksum::*;
pub use cores::*;
pub use entry::*;
pub use store_json::*;
