//! # Subscribe event engine states module.
//!
//! The module contains the [`SubscribeState`] type, which describes the
//! states of the subscription loop, and the implementation of `transition`
//! between them in response to events.

use crate::{
    core::{
        event_engine::{State, Transition},
        FanlineError,
    },
    subscribe::{
        event_engine::{
            types::SubscriptionInput,
            SubscribeEffectInvocation::{
                self, CancelHandshake, CancelReceive, EmitMessages, EmitStatus, Handshake, Receive,
            },
            SubscribeEvent,
        },
        result::Envelope,
        ConnectionStatus, SubscriptionCursor,
    },
};

/// States of the subscribe state machine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubscribeState {
    /// Unsubscribed state.
    ///
    /// The initial state has no information about channels or groups from
    /// which events should be retrieved in real-time.
    Unsubscribed,

    /// Subscription initiation state.
    ///
    /// Performs the initial subscription which will establish the
    /// subscription loop.
    Handshaking {
        /// Channels and groups which will be the source of real-time
        /// updates after initial subscription completion.
        input: SubscriptionInput,

        /// Custom time cursor.
        ///
        /// Set when a subscription should catch up from a specific point in
        /// time instead of the next service-provided one.
        cursor: Option<SubscriptionCursor>,

        /// Whether presence should be announced before the long-poll
        /// starts.
        ///
        /// Set for user-initiated subscription changes; internal replays
        /// don't announce presence again.
        send_heartbeat: bool,
    },

    /// Initial subscription stopped state.
    HandshakeStopped {
        /// Channels and groups for which the initial subscription stopped.
        input: SubscriptionInput,

        /// Custom time cursor.
        cursor: Option<SubscriptionCursor>,
    },

    /// Initial subscription failure state.
    ///
    /// The system wasn't able to perform a successful initial subscription.
    /// An explicit reconnect is required to recover.
    HandshakeFailed {
        /// Channels and groups which have been used during the recently
        /// failed initial subscription.
        input: SubscriptionInput,

        /// Custom time cursor.
        cursor: Option<SubscriptionCursor>,

        /// Initial subscribe attempt failure reason.
        reason: FanlineError,
    },

    /// Receiving updates state.
    ///
    /// The state machine is in the state where it receives real-time updates
    /// from the service.
    Receiving {
        /// Channels and groups for which real-time updates are delivered.
        input: SubscriptionInput,

        /// Time cursor.
        ///
        /// Cursor used by the subscription loop to identify the point in
        /// time after which updates will be delivered.
        cursor: SubscriptionCursor,
    },

    /// Updates receiving stopped state.
    ReceiveStopped {
        /// Channels and groups for which updates receive stopped.
        input: SubscriptionInput,

        /// Time cursor.
        cursor: SubscriptionCursor,
    },

    /// Updates receiving failure state.
    ///
    /// The system wasn't able to receive updates. An explicit reconnect is
    /// required to recover.
    ReceiveFailed {
        /// Channels and groups which have been used during the recently
        /// failed receive.
        input: SubscriptionInput,

        /// Time cursor.
        cursor: SubscriptionCursor,

        /// Receive updates attempt failure reason.
        reason: FanlineError,
    },
}

impl SubscribeState {
    /// Handle channels / groups list change event.
    fn subscription_changed_transition(
        &self,
        channels: &Option<Vec<String>>,
        channel_groups: &Option<Vec<String>>,
        sent_by_ee: bool,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        let input = SubscriptionInput::new(channels, channel_groups);

        match self {
            Self::Unsubscribed => (!input.is_empty()).then(|| {
                self.transition_to(
                    Self::Handshaking {
                        input,
                        cursor: None,
                        send_heartbeat: !sent_by_ee,
                    },
                    None,
                )
            }),
            Self::Handshaking { cursor, .. } | Self::HandshakeFailed { cursor, .. } => {
                Some(if input.is_empty() {
                    self.transition_to(Self::Unsubscribed, None)
                } else {
                    self.transition_to(
                        Self::Handshaking {
                            input,
                            cursor: cursor.clone(),
                            send_heartbeat: !sent_by_ee,
                        },
                        None,
                    )
                })
            }
            Self::HandshakeStopped { cursor, .. } => Some(self.transition_to(
                Self::HandshakeStopped {
                    input,
                    cursor: cursor.clone(),
                },
                None,
            )),
            Self::Receiving { cursor, .. } => Some(if input.is_empty() {
                self.transition_to(
                    Self::Unsubscribed,
                    Some(vec![EmitStatus(ConnectionStatus::Disconnected)]),
                )
            } else {
                self.transition_to(
                    Self::Handshaking {
                        input,
                        cursor: Some(cursor.clone()),
                        send_heartbeat: !sent_by_ee,
                    },
                    Some(vec![EmitStatus(ConnectionStatus::SubscriptionChanged {
                        channels: channels.clone(),
                        channel_groups: channel_groups.clone(),
                    })]),
                )
            }),
            Self::ReceiveFailed { cursor, .. } => Some(self.transition_to(
                Self::Handshaking {
                    input,
                    cursor: Some(cursor.clone()),
                    send_heartbeat: !sent_by_ee,
                },
                None,
            )),
            Self::ReceiveStopped { cursor, .. } => Some(self.transition_to(
                Self::ReceiveStopped {
                    input,
                    cursor: cursor.clone(),
                },
                None,
            )),
        }
    }

    /// Handle catch-up event.
    ///
    /// The event is sent when a subscription has been created with a
    /// specific `cursor`.
    fn subscription_restored_transition(
        &self,
        channels: &Option<Vec<String>>,
        channel_groups: &Option<Vec<String>>,
        restore_cursor: &SubscriptionCursor,
        sent_by_ee: bool,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        let input = SubscriptionInput::new(channels, channel_groups);

        match self {
            Self::Unsubscribed | Self::Handshaking { .. } | Self::ReceiveFailed { .. } => {
                Some(self.transition_to(
                    Self::Handshaking {
                        input,
                        cursor: Some(restore_cursor.clone()),
                        send_heartbeat: !sent_by_ee,
                    },
                    None,
                ))
            }
            Self::HandshakeFailed { .. } => Some(if input.is_empty() {
                self.transition_to(Self::Unsubscribed, None)
            } else {
                self.transition_to(
                    Self::Handshaking {
                        input,
                        cursor: Some(restore_cursor.clone()),
                        send_heartbeat: !sent_by_ee,
                    },
                    None,
                )
            }),
            Self::HandshakeStopped { .. } => Some(self.transition_to(
                Self::HandshakeStopped {
                    input,
                    cursor: Some(restore_cursor.clone()),
                },
                None,
            )),
            Self::Receiving { .. } => Some(if input.is_empty() {
                self.transition_to(
                    Self::Unsubscribed,
                    Some(vec![EmitStatus(ConnectionStatus::Disconnected)]),
                )
            } else {
                self.transition_to(
                    Self::Handshaking {
                        input,
                        cursor: Some(restore_cursor.clone()),
                        send_heartbeat: !sent_by_ee,
                    },
                    Some(vec![EmitStatus(ConnectionStatus::SubscriptionChanged {
                        channels: channels.clone(),
                        channel_groups: channel_groups.clone(),
                    })]),
                )
            }),
            Self::ReceiveStopped { .. } => Some(self.transition_to(
                Self::ReceiveStopped {
                    input,
                    cursor: restore_cursor.clone(),
                },
                None,
            )),
        }
    }

    /// Handle initial handshake success event.
    fn handshake_success_transition(
        &self,
        next_cursor: &SubscriptionCursor,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        match self {
            Self::Handshaking { input, cursor, .. } => {
                // Merge the stored catch-up timetoken with the
                // service-provided region.
                let mut next_cursor = next_cursor.clone();
                if let Some(cursor) = cursor {
                    next_cursor.timetoken = cursor.timetoken.clone();
                }

                Some(self.transition_to(
                    Self::Receiving {
                        input: input.clone(),
                        cursor: next_cursor,
                    },
                    Some(vec![EmitStatus(ConnectionStatus::Connected)]),
                ))
            }
            _ => None,
        }
    }

    /// Handle initial handshake failure event.
    fn handshake_failure_transition(
        &self,
        reason: &FanlineError,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        // Request cancellation shouldn't cause any transition because the
        // superseding transition already installed the next state.
        if reason.is_cancellation() {
            return None;
        }

        match self {
            Self::Handshaking { input, cursor, .. } => Some(self.transition_to(
                Self::HandshakeFailed {
                    input: input.clone(),
                    cursor: cursor.clone(),
                    reason: reason.clone(),
                },
                Some(vec![EmitStatus(ConnectionStatus::ConnectionError(
                    reason.clone(),
                ))]),
            )),
            _ => None,
        }
    }

    /// Handle updates receive success event.
    fn receive_success_transition(
        &self,
        cursor: &SubscriptionCursor,
        messages: &[Envelope],
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        match self {
            Self::Receiving { input, .. } => Some(self.transition_to(
                Self::Receiving {
                    input: input.clone(),
                    cursor: cursor.clone(),
                },
                Some(vec![EmitMessages(messages.to_vec(), cursor.clone())]),
            )),
            _ => None,
        }
    }

    /// Handle updates receive failure event.
    fn receive_failure_transition(
        &self,
        reason: &FanlineError,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        // Request cancellation shouldn't cause any transition because the
        // superseding transition already installed the next state.
        if reason.is_cancellation() {
            return None;
        }

        match self {
            Self::Receiving { input, cursor } => Some(self.transition_to(
                Self::ReceiveFailed {
                    input: input.clone(),
                    cursor: cursor.clone(),
                    reason: reason.clone(),
                },
                Some(vec![EmitStatus(
                    ConnectionStatus::DisconnectedUnexpectedly(reason.clone()),
                )]),
            )),
            _ => None,
        }
    }

    /// Handle disconnect event.
    ///
    /// The event is sent when the client is asked to temporarily stop any
    /// subscription activity.
    fn disconnect_transition(&self) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        match self {
            Self::Handshaking { input, cursor, .. } => Some(self.transition_to(
                Self::HandshakeStopped {
                    input: input.clone(),
                    cursor: cursor.clone(),
                },
                None,
            )),
            Self::Receiving { input, cursor } => Some(self.transition_to(
                Self::ReceiveStopped {
                    input: input.clone(),
                    cursor: cursor.clone(),
                },
                Some(vec![EmitStatus(ConnectionStatus::Disconnected)]),
            )),
            _ => None,
        }
    }

    /// Handle reconnect event.
    ///
    /// The event is sent when the client is asked to restore activity after
    /// a temporary stop or a failure.
    fn reconnect_transition(
        &self,
        restore_cursor: &Option<SubscriptionCursor>,
    ) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        match self {
            Self::HandshakeStopped { input, cursor }
            | Self::HandshakeFailed { input, cursor, .. } => Some(self.transition_to(
                Self::Handshaking {
                    input: input.clone(),
                    cursor: restore_cursor.clone().or_else(|| cursor.clone()),
                    send_heartbeat: false,
                },
                None,
            )),
            Self::ReceiveStopped { input, cursor } | Self::ReceiveFailed { input, cursor, .. } => {
                Some(self.transition_to(
                    Self::Handshaking {
                        input: input.clone(),
                        cursor: restore_cursor.clone().or_else(|| Some(cursor.clone())),
                        send_heartbeat: false,
                    },
                    None,
                ))
            }
            _ => None,
        }
    }

    /// Handle unsubscribe all event.
    fn unsubscribe_all_transition(&self) -> Option<Transition<Self, SubscribeEffectInvocation>> {
        match self {
            Self::Unsubscribed => None,
            Self::Receiving { .. } => Some(self.transition_to(
                Self::Unsubscribed,
                Some(vec![EmitStatus(ConnectionStatus::Disconnected)]),
            )),
            _ => Some(self.transition_to(Self::Unsubscribed, None)),
        }
    }
}

impl State for SubscribeState {
    type Invocation = SubscribeEffectInvocation;

    fn enter(&self) -> Option<Vec<Self::Invocation>> {
        match self {
            Self::Handshaking {
                input,
                cursor,
                send_heartbeat,
            } => Some(vec![Handshake {
                input: input.clone(),
                cursor: cursor.clone(),
                send_heartbeat: *send_heartbeat,
            }]),
            Self::Receiving { input, cursor } => Some(vec![Receive {
                input: input.clone(),
                cursor: cursor.clone(),
            }]),
            _ => None,
        }
    }

    fn exit(&self) -> Option<Vec<Self::Invocation>> {
        match self {
            Self::Handshaking { .. } => Some(vec![CancelHandshake]),
            Self::Receiving { .. } => Some(vec![CancelReceive]),
            _ => None,
        }
    }

    fn transition(&self, event: &SubscribeEvent) -> Option<Transition<Self, Self::Invocation>> {
        match event {
            SubscribeEvent::SubscriptionChanged {
                channels,
                channel_groups,
                sent_by_ee,
            } => self.subscription_changed_transition(channels, channel_groups, *sent_by_ee),
            SubscribeEvent::SubscriptionRestored {
                channels,
                channel_groups,
                cursor,
                sent_by_ee,
            } => self.subscription_restored_transition(
                channels,
                channel_groups,
                cursor,
                *sent_by_ee,
            ),
            SubscribeEvent::HandshakeSuccess { cursor } => {
                self.handshake_success_transition(cursor)
            }
            SubscribeEvent::HandshakeFailure { reason } => {
                self.handshake_failure_transition(reason)
            }
            SubscribeEvent::ReceiveSuccess { cursor, messages } => {
                self.receive_success_transition(cursor, messages)
            }
            SubscribeEvent::ReceiveFailure { reason } => self.receive_failure_transition(reason),
            SubscribeEvent::Disconnect => self.disconnect_transition(),
            SubscribeEvent::Reconnect { cursor } => self.reconnect_transition(cursor),
            SubscribeEvent::UnsubscribeAll => self.unsubscribe_all_transition(),
        }
    }
}
