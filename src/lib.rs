// lib.rs
#![warn(clippy::large_futures)]

pub use std::{collections::VecDeque, pin::Pin, sync::Arc};

pub use chrono::NaiveDateTime;
#[cfg(feature = "esp")]
pub use esp_idf_svc::nvs;
pub use log::*;
pub use serde::{Deserialize, Serialize};
pub use tokio::sync::RwLock;
pub use tokio::time::{sleep, timeout, Duration};

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest telegram the P1 port is expected to emit, in bytes.
pub const MAX_TELEGRAM_LEN: usize = 1536;

/// Capacity of one register value.
pub const MAX_VALUE_LEN: usize = 33;

mod error;
pub use error::*;

mod obis;
pub use obis::*;

mod p1port;
pub use p1port::*;

mod envelope;
pub use envelope::*;

mod gcm;
pub use gcm::*;

mod snapshot;
pub use snapshot::*;

mod dsmr;
pub use dsmr::*;

mod smarty;
pub use smarty::*;

mod config;
pub use config::*;

mod state;
pub use state::*;

mod measure;
pub use measure::*;

#[cfg(test)]
mod testutil;

// EOF
