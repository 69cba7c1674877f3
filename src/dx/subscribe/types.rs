//! Subscription types module.

use crate::core::FanlineError;

use std::cmp::Ordering;

/// Time cursor.
///
/// Cursor used by the subscription loop to identify the point in time after
/// which updates will be delivered.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubscriptionCursor {
    /// Timetoken which is used to specify the point in time.
    ///
    /// An opaque ASCII decimal string. A value starting from `'0'` means
    /// "initial / no catch-up".
    pub timetoken: String,

    /// Data center region for which `timetoken` has been generated.
    pub region: u32,
}

impl SubscriptionCursor {
    /// Whether the cursor requests a handshake instead of a catch-up.
    pub(crate) fn is_initial(&self) -> bool {
        self.timetoken.starts_with('0')
    }

    /// Numeric representation of the stored timetoken.
    pub(crate) fn timetoken_value(&self) -> usize {
        self.timetoken.parse::<usize>().unwrap_or(0)
    }
}

impl Default for SubscriptionCursor {
    fn default() -> Self {
        Self {
            timetoken: "0".into(),
            region: 0,
        }
    }
}

impl From<u64> for SubscriptionCursor {
    fn from(value: u64) -> Self {
        Self {
            timetoken: value.to_string(),
            region: 0,
        }
    }
}

impl From<String> for SubscriptionCursor {
    fn from(value: String) -> Self {
        Self {
            timetoken: value,
            region: 0,
        }
    }
}

impl PartialOrd for SubscriptionCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.timetoken_value().cmp(&other.timetoken_value()))
    }
}

/// Subscription connection statuses.
///
/// Passed to status listener streams each time the subscription loop moves
/// between meaningful states.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    /// Successfully connected and receiving real-time updates.
    Connected,

    /// Initial subscription attempt failed.
    ///
    /// The loop stays parked until an explicit reconnect.
    ConnectionError(FanlineError),

    /// Real-time updates receive stopped on user request.
    Disconnected,

    /// Real-time updates receive failed unexpectedly.
    ///
    /// The loop stays parked until an explicit reconnect.
    DisconnectedUnexpectedly(FanlineError),

    /// The set of channels and channel groups in the subscription loop has
    /// been changed while the client was receiving updates.
    SubscriptionChanged {
        /// Channels which are part of the subscription loop now.
        channels: Option<Vec<String>>,

        /// Channel groups which are part of the subscription loop now.
        channel_groups: Option<Vec<String>>,
    },
}

/// Subscription behaviour options.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionOptions {
    /// Whether presence events for the subscribed entity should be received
    /// as well.
    ///
    /// Adds the `<name>-pnpres` companion channel to the subscription.
    ReceivePresenceEvents,
}

/// Service-defined type of a real-time update.
///
/// Reported by the transport for each envelope parsed out of a subscribe
/// response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnvelopeMessageType {
    /// A message published into a channel.
    Published,

    /// A lightweight signal sent into a channel.
    Signal,

    /// A change of an action associated with a previously published message.
    Action,

    /// An application context (channel / user metadata) change.
    Objects,

    /// A file sharing notification.
    Files,
}

/// Real-time message.
///
/// The payload stays opaque to the client core: parsing of the body is the
/// responsibility of application code.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Identifier of the client which sent the message, when known.
    pub sender: Option<String>,

    /// Time when the message has been received by the service.
    pub timestamp: usize,

    /// Name of the channel where the message has been received.
    pub channel: String,

    /// Actual name of the subscription through which the message has been
    /// delivered.
    ///
    /// Either the channel itself or the channel group name when the update
    /// has been delivered through a group subscription.
    pub subscription: String,

    /// Raw message payload.
    pub data: Vec<u8>,

    /// Service-set message flags.
    pub flags: u32,
}

/// Events delivered through a combined listener stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeStreamEvent {
    /// Connection status change.
    Status(ConnectionStatus),

    /// Real-time update.
    Update(crate::subscribe::Update),
}
