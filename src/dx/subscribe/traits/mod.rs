//! # Subscription traits module
//!
//! This module provides the set of traits which are implemented by types to
//! support subscription to real-time events.

#[doc(inline)]
pub use event_subscribe::EventSubscriber;
mod event_subscribe;

#[doc(inline)]
pub use subscriber::Subscriber;
mod subscriber;

#[doc(inline)]
pub use subscribable::{Subscribable, SubscribableType};
mod subscribable;

#[doc(inline)]
pub use event_emitter::EventEmitter;
mod event_emitter;

#[doc(inline)]
pub(crate) use event_handler::EventHandler;
mod event_handler;
