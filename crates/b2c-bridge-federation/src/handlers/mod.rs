//! HTTP handlers for the B2C login bridge.

pub mod cookie;
pub mod federation;
