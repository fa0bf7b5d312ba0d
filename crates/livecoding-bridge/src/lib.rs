//! # Live Coding Bridge
//!
//! HTTP front end for [`livecoding_core`]: a trigger route that admits one
//! compile at a time and a status route pollers use to read the outcome.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod cli;
pub mod engine;
pub mod http;
pub mod server;
pub mod shutdown;

pub use engine::CommandEngine;
pub use http::{router, AppState, CompilePayload};
