//! Core module
//!
//! This module contains the core types and traits shared between features of
//! the Fanline client: the error type, the transport boundary, the runtime
//! abstraction, the entity graph and the generic event engine.

#[doc(inline)]
pub use error::FanlineError;
pub mod error;

#[doc(inline)]
pub use transport::{HeartbeatRequest, LeaveRequest, SubscribeRequest, Transport};
pub mod transport;

#[doc(inline)]
pub use runtime::Runtime;
pub(crate) use runtime::RuntimeSupport;
pub mod runtime;

#[doc(inline)]
pub use data_stream::DataStream;
pub mod data_stream;

#[doc(inline)]
pub use entity::FanlineEntity;
pub(crate) use entity::validate_entity_name;
pub mod entity;

#[doc(inline)]
pub use channel::Channel;
pub mod channel;

#[doc(inline)]
pub use channel_group::ChannelGroup;
pub mod channel_group;

#[doc(inline)]
pub use channel_metadata::ChannelMetadata;
pub mod channel_metadata;

#[doc(inline)]
pub use user_metadata::UserMetadata;
pub mod user_metadata;

pub(crate) mod event_engine;
