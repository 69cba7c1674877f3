//! # Fanline realtime client SDK for Rust
//!
//! Async client for the [`Fanline`] hosted publish/subscribe messaging
//! service.
//!
//! - Fully `async`/`await` ready.
//! - Transport-layer agnostic: bring any implementation of the
//!   [`core::Transport`] trait.
//! - Subscription loop is modeled as an event engine, which makes the
//!   long-poll lifecycle deterministic and testable.
//!
//! [`Fanline`]: https://www.fanline.io/

#![deny(clippy::all)]
#![allow(clippy::doc_markdown)]

#[doc(inline)]
pub use dx::client::{FanlineClient, FanlineClientBuilder, FanlineClientInstance, Keyset};
pub mod dx;

pub mod core;
pub mod providers;

#[doc(inline)]
pub use crate::core::{Channel, ChannelGroup, ChannelMetadata, UserMetadata};

pub mod subscribe {
    //! Subscribe feature surface.
    //!
    //! Re-exports everything required to subscribe for real-time updates and
    //! attach listener streams to the client, subscriptions and subscription
    //! sets.

    #[doc(inline)]
    pub use crate::dx::subscribe::*;
}
