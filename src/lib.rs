//! carrierline library - carrier display name resolution and IMS SMS retry
//!
//! - `cdnr`: merges SIM, carrier config and network data into the name shown
//!   in the status bar
//! - `sms`: IMS SMS dispatch with TP-RD retries and circuit-switched fallback

pub mod cdnr;
pub mod cli;
pub mod config;
pub mod redact;
pub mod scenario;
pub mod sms;
