use crate::{
    core::event_engine::EffectInvocation,
    subscribe::{
        event_engine::{SubscribeEffect, SubscribeEvent, SubscriptionInput},
        result::Envelope,
        ConnectionStatus, SubscriptionCursor,
    },
};

use std::fmt::{Display, Formatter, Result};

/// Subscribe effect invocations.
///
/// An invocation is a form of intention to call some action without any
/// information about its implementation.
#[derive(Debug)]
pub(crate) enum SubscribeEffectInvocation {
    /// Initial subscribe effect invocation.
    Handshake {
        /// Channels and groups which will be the source of real-time updates
        /// after initial subscription completion.
        input: SubscriptionInput,

        /// Custom time cursor for catch-up, if any.
        cursor: Option<SubscriptionCursor>,

        /// Whether presence should be announced before the long-poll starts.
        send_heartbeat: bool,
    },

    /// Cancel initial subscribe effect invocation.
    CancelHandshake,

    /// Receive updates effect invocation.
    Receive {
        /// Channels and groups for which real-time updates will be
        /// delivered.
        input: SubscriptionInput,

        /// Time cursor of the previous subscription loop cycle.
        cursor: SubscriptionCursor,
    },

    /// Cancel receive updates effect invocation.
    CancelReceive,

    /// Status change notification effect invocation.
    EmitStatus(ConnectionStatus),

    /// Received updates notification effect invocation.
    EmitMessages(Vec<Envelope>, SubscriptionCursor),

    /// Terminate the subscribe event engine processing loop.
    TerminateEventEngine,
}

impl EffectInvocation for SubscribeEffectInvocation {
    type Effect = SubscribeEffect;
    type Event = SubscribeEvent;

    fn id(&self) -> &str {
        match self {
            Self::Handshake { .. } => "HANDSHAKE",
            Self::CancelHandshake => "CANCEL_HANDSHAKE",
            Self::Receive { .. } => "RECEIVE_MESSAGES",
            Self::CancelReceive => "CANCEL_RECEIVE_MESSAGES",
            Self::EmitStatus(_) => "EMIT_STATUS",
            Self::EmitMessages(_, _) => "EMIT_MESSAGES",
            Self::TerminateEventEngine => "TERMINATE_EVENT_ENGINE",
        }
    }

    fn is_managed(&self) -> bool {
        matches!(self, Self::Handshake { .. } | Self::Receive { .. })
    }

    fn is_cancelling(&self) -> bool {
        matches!(self, Self::CancelHandshake | Self::CancelReceive)
    }

    fn cancelling_effect(&self, effect: &Self::Effect) -> bool {
        (matches!(effect, SubscribeEffect::Handshake { .. })
            && matches!(self, Self::CancelHandshake))
            || (matches!(effect, SubscribeEffect::Receive { .. })
                && matches!(self, Self::CancelReceive))
    }

    fn is_terminating(&self) -> bool {
        matches!(self, Self::TerminateEventEngine)
    }
}

impl Display for SubscribeEffectInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::EmitStatus(status) => write!(f, "EMIT_STATUS({status:?})"),
            Self::EmitMessages(messages, _) => write!(f, "EMIT_MESSAGES({messages:?})"),
            _ => write!(f, "{}", EffectInvocation::id(self)),
        }
    }
}
