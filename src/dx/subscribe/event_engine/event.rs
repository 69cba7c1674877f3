use crate::{
    core::{event_engine::Event, FanlineError},
    subscribe::{result::Envelope, SubscriptionCursor},
};

/// Subscription events.
///
/// The subscribe state machine behaviour depends on external events which it
/// receives from the facade and from completed effects.
#[derive(Debug)]
pub(crate) enum SubscribeEvent {
    /// Current list of channels / groups has been changed.
    ///
    /// Emitted when an updated list of channels / groups has been passed for
    /// subscription. `sent_by_ee` distinguishes internal replays from
    /// user-initiated changes, which should announce presence before the
    /// next long-poll.
    SubscriptionChanged {
        channels: Option<Vec<String>>,
        channel_groups: Option<Vec<String>>,
        sent_by_ee: bool,
    },

    /// Catching up on updates.
    ///
    /// Emitted when a subscription has been created with a cursor starting
    /// from which updates should be received.
    SubscriptionRestored {
        channels: Option<Vec<String>>,
        channel_groups: Option<Vec<String>>,
        cursor: SubscriptionCursor,
        sent_by_ee: bool,
    },

    /// Handshake completed successfully.
    ///
    /// Carries the cursor which will position the subscription loop.
    HandshakeSuccess { cursor: SubscriptionCursor },

    /// Handshake completed with an error.
    HandshakeFailure { reason: FanlineError },

    /// Receive updates completed successfully.
    ///
    /// Carries the list of real-time updates along with the cursor for the
    /// next subscription loop cycle.
    ReceiveSuccess {
        cursor: SubscriptionCursor,
        messages: Vec<Envelope>,
    },

    /// Receive updates completed with an error.
    ReceiveFailure { reason: FanlineError },

    /// Disconnect from the service.
    ///
    /// Emitted when explicitly requested to stop receiving real-time
    /// updates.
    Disconnect,

    /// Reconnect to the service.
    ///
    /// Emitted when explicitly requested to restore real-time updates
    /// receive after a stop or a failure.
    Reconnect { cursor: Option<SubscriptionCursor> },

    /// Unsubscribe from all channels and groups.
    UnsubscribeAll,
}

impl Event for SubscribeEvent {
    fn id(&self) -> &str {
        match self {
            Self::SubscriptionChanged { .. } => "SUBSCRIPTION_CHANGED",
            Self::SubscriptionRestored { .. } => "SUBSCRIPTION_RESTORED",
            Self::HandshakeSuccess { .. } => "HANDSHAKE_SUCCESS",
            Self::HandshakeFailure { .. } => "HANDSHAKE_FAILURE",
            Self::ReceiveSuccess { .. } => "RECEIVE_SUCCESS",
            Self::ReceiveFailure { .. } => "RECEIVE_FAILURE",
            Self::Disconnect => "DISCONNECT",
            Self::Reconnect { .. } => "RECONNECT",
            Self::UnsubscribeAll => "UNSUBSCRIBE_ALL",
        }
    }
}
