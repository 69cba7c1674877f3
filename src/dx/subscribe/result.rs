//! Subscribe result module.
//!
//! This module contains the [`SubscribeResult`] type used to represent the
//! outcome of a single long-poll cycle, and the [`Update`] type under which
//! real-time events reach listener streams.

use crate::subscribe::{EnvelopeMessageType, Message, SubscriptionCursor};

/// The result of a subscribe operation.
///
/// Contains the next subscription cursor and the list of raw real-time
/// update envelopes parsed by the transport from the service response.
#[derive(Debug)]
pub struct SubscribeResult {
    /// Time cursor for the next subscription loop cycle.
    pub cursor: SubscriptionCursor,

    /// Received real-time update envelopes.
    pub messages: Vec<Envelope>,
}

/// A single raw entry from a subscribe response.
///
/// The transport reports each parsed update in this envelope form; the
/// subscribe event engine maps envelopes onto typed [`Update`]s before they
/// reach listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Name of the channel where the update has been received.
    pub channel: String,

    /// Name of the channel group through which the update has been
    /// delivered, when the client is subscribed to the channel through a
    /// group.
    pub subscription: Option<String>,

    /// Service-defined type of the update.
    pub message_type: EnvelopeMessageType,

    /// Raw update payload.
    pub payload: Vec<u8>,

    /// Identifier of the client which sent the update (when known).
    pub sender: Option<String>,

    /// Update "publish" time.
    pub published: SubscriptionCursor,

    /// Service-set flags.
    pub flags: u32,
}

/// Real-time update object.
///
/// Each object represents a specific real-time event and carries enough
/// information to route it to the listener streams interested in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Real-time message update.
    Message(Message),

    /// Real-time signal update.
    Signal(Message),

    /// Message's action real-time update.
    MessageAction(Message),

    /// Application context (channel / user metadata) real-time update.
    Object(Message),

    /// File sharing real-time update.
    File(Message),
}

impl Update {
    /// Name of the subscription through which the update has been delivered.
    ///
    /// This is the subscribable identifier against which per-subscription
    /// listener routing is performed.
    pub(crate) fn subscription(&self) -> String {
        self.message().subscription.clone()
    }

    /// Time when the update has been received by the service.
    pub(crate) fn event_timestamp(&self) -> usize {
        self.message().timestamp
    }

    fn message(&self) -> &Message {
        match self {
            Self::Message(message)
            | Self::Signal(message)
            | Self::MessageAction(message)
            | Self::Object(message)
            | Self::File(message) => message,
        }
    }
}

impl From<Envelope> for Update {
    fn from(value: Envelope) -> Self {
        let message = Message {
            sender: value.sender,
            timestamp: value.published.timetoken_value(),
            subscription: value.subscription.unwrap_or_else(|| value.channel.clone()),
            channel: value.channel,
            data: value.payload,
            flags: value.flags,
        };

        match value.message_type {
            EnvelopeMessageType::Published => Self::Message(message),
            EnvelopeMessageType::Signal => Self::Signal(message),
            EnvelopeMessageType::Action => Self::MessageAction(message),
            EnvelopeMessageType::Objects => Self::Object(message),
            EnvelopeMessageType::Files => Self::File(message),
        }
    }
}
