//! Providers module
//!
//! This module contains implementations of the traits which the client
//! expects from the surrounding environment.

#[cfg(feature = "tokio")]
pub mod futures_tokio;
