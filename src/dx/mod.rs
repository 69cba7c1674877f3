//! Features module
//!
//! This module contains the client and the feature surfaces of the Fanline
//! SDK.

pub mod client;
pub mod presence;
pub mod subscribe;
