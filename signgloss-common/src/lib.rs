//! # SignGloss Common Library
//!
//! Shared code for the SignGloss services including:
//! - Error and result types
//! - TOML configuration loading and secret resolution
//! - Timestamp utilities and the injectable clock

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
