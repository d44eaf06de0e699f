//! folder-audit - append-only audit trail of file activity in monitored folders.

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod monitor;
pub mod pipeline;
pub mod source;
