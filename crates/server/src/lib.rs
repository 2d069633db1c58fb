//! HTTP front end for the reelsplice merge service.

pub mod api;
pub mod metrics;
pub mod state;
