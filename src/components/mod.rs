//! Driver components: connection lifecycle, feature control, acquisition.

pub mod acquisition;
pub mod connection;
pub mod features;
