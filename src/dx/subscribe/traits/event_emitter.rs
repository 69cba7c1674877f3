//! # Event emitter module.
//!
//! This module contains the [`EventEmitter`] trait, which is implemented by
//! objects that deliver real-time events through listener streams.

use crate::{
    core::DataStream,
    subscribe::{Message, Update},
};

/// Events emitter trait.
///
/// Types that implement this trait provide streams dedicated to specific
/// real-time event types.
pub trait EventEmitter {
    /// Stream used to notify regular messages.
    fn messages_stream(&self) -> DataStream<Message>;

    /// Stream used to notify signals.
    fn signals_stream(&self) -> DataStream<Message>;

    /// Stream used to notify message action updates.
    fn message_actions_stream(&self) -> DataStream<Message>;

    /// Stream used to notify application context (channel and user metadata)
    /// updates.
    fn objects_stream(&self) -> DataStream<Message>;

    /// Stream used to notify about file sharing events.
    fn files_stream(&self) -> DataStream<Message>;

    /// Generic stream used to notify all updates mentioned above.
    fn stream(&self) -> DataStream<Update>;
}
