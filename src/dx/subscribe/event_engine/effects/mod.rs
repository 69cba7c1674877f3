//! # Subscribe event engine effects module.

use async_channel::Sender;
use futures::future::BoxFuture;
use log::error;
use uuid::Uuid;

use crate::{
    core::{event_engine::Effect, FanlineError},
    subscribe::{
        event_engine::{
            types::{SubscriptionInput, SubscriptionParams},
            SubscribeEffectInvocation, SubscribeEvent,
        },
        result::{Envelope, SubscribeResult},
        ConnectionStatus, SubscriptionCursor,
    },
};

use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

mod emit_messages;
mod emit_status;
mod handshake;
mod receive;

/// Executor of long-poll subscribe calls.
///
/// Takes [`SubscriptionParams`] as input and returns a future which resolves
/// to a [`SubscribeResult`] or a [`FanlineError`]. A cancelled call resolves
/// to [`FanlineError::EffectCanceled`].
pub(in crate::dx::subscribe) type SubscribeEffectExecutor = dyn Fn(SubscriptionParams) -> BoxFuture<'static, Result<SubscribeResult, FanlineError>>
    + Send
    + Sync;

/// Executor of connection status notifications.
pub(in crate::dx::subscribe) type EmitStatusEffectExecutor = dyn Fn(ConnectionStatus) + Send + Sync;

/// Executor of real-time updates notifications.
pub(in crate::dx::subscribe) type EmitMessagesEffectExecutor =
    dyn Fn(Vec<Envelope>, SubscriptionCursor) + Send + Sync;

/// Effects of the subscribe event engine.
pub(crate) enum SubscribeEffect {
    /// Initial subscribe effect.
    Handshake {
        /// Unique effect identifier.
        id: String,

        /// Channels and groups which will be the source of real-time updates
        /// after initial subscription completion.
        input: SubscriptionInput,

        /// Custom time cursor for catch-up, if any.
        cursor: Option<SubscriptionCursor>,

        /// Whether presence should be announced before the long-poll starts.
        send_heartbeat: bool,

        /// Function which will be used to perform the initial subscription.
        executor: Arc<SubscribeEffectExecutor>,

        /// Channel which will be used to cancel effect execution.
        cancellation_channel: Sender<String>,
    },

    /// Receive updates effect.
    Receive {
        /// Unique effect identifier.
        id: String,

        /// Channels and groups for which real-time updates will be
        /// delivered.
        input: SubscriptionInput,

        /// Time cursor of the previous subscription loop cycle.
        cursor: SubscriptionCursor,

        /// Function which will be used to receive real-time updates.
        executor: Arc<SubscribeEffectExecutor>,

        /// Channel which will be used to cancel effect execution.
        cancellation_channel: Sender<String>,
    },

    /// Status change notification effect.
    EmitStatus {
        /// Unique effect identifier.
        id: String,

        /// Status which should be emitted.
        status: ConnectionStatus,

        /// Function which will be used to notify status listeners.
        executor: Arc<EmitStatusEffectExecutor>,
    },

    /// Received updates notification effect.
    EmitMessages {
        /// Unique effect identifier.
        id: String,

        /// Cursor which will be used for the next subscription loop cycle.
        next_cursor: SubscriptionCursor,

        /// Updates which should be emitted.
        updates: Vec<Envelope>,

        /// Function which will be used to notify updates listeners.
        executor: Arc<EmitMessagesEffectExecutor>,
    },
}

impl SubscribeEffect {
    pub(super) fn unique_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl Debug for SubscribeEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Handshake { input, cursor, .. } => write!(
                f,
                "SubscribeEffect::Handshake {{ channels: {:?}, channel groups: {:?}, cursor: \
                {cursor:?} }}",
                input.channels(),
                input.channel_groups()
            ),
            Self::Receive { input, cursor, .. } => write!(
                f,
                "SubscribeEffect::Receive {{ channels: {:?}, channel groups: {:?}, cursor: \
                {cursor:?} }}",
                input.channels(),
                input.channel_groups()
            ),
            Self::EmitStatus { status, .. } => {
                write!(f, "SubscribeEffect::EmitStatus {{ status: {status:?} }}")
            }
            Self::EmitMessages { updates, .. } => {
                write!(f, "SubscribeEffect::EmitMessages {{ messages: {updates:?} }}")
            }
        }
    }
}

#[async_trait::async_trait]
impl Effect for SubscribeEffect {
    type Invocation = SubscribeEffectInvocation;

    fn name(&self) -> String {
        match self {
            Self::Handshake { .. } => "HANDSHAKE",
            Self::Receive { .. } => "RECEIVE_MESSAGES",
            Self::EmitStatus { .. } => "EMIT_STATUS",
            Self::EmitMessages { .. } => "EMIT_MESSAGES",
        }
        .into()
    }

    fn id(&self) -> String {
        match self {
            Self::Handshake { id, .. }
            | Self::Receive { id, .. }
            | Self::EmitStatus { id, .. }
            | Self::EmitMessages { id, .. } => id,
        }
        .into()
    }

    async fn run(&self) -> Vec<SubscribeEvent> {
        match self {
            Self::Handshake {
                id,
                input,
                cursor,
                send_heartbeat,
                executor,
                ..
            } => handshake::execute(input, cursor, *send_heartbeat, id, executor).await,
            Self::Receive {
                id,
                input,
                cursor,
                executor,
                ..
            } => receive::execute(input, cursor, id, executor).await,
            Self::EmitStatus {
                status, executor, ..
            } => emit_status::execute(status.clone(), executor),
            Self::EmitMessages {
                next_cursor,
                updates,
                executor,
                ..
            } => emit_messages::execute(next_cursor.clone(), updates.clone(), executor),
        }
    }

    fn cancel(&self) {
        match self {
            Self::Handshake {
                id,
                cancellation_channel,
                ..
            }
            | Self::Receive {
                id,
                cancellation_channel,
                ..
            } => {
                if let Err(err) = cancellation_channel.send_blocking(id.clone()) {
                    error!("Unable to request effect cancellation: {err}");
                }
            }
            _ => { /* cannot cancel other effects */ }
        }
    }
}

#[cfg(test)]
mod should {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn send_cancellation_notification() {
        let (tx, rx) = async_channel::bounded::<String>(1);

        let effect = SubscribeEffect::Handshake {
            id: SubscribeEffect::unique_id(),
            input: SubscriptionInput::new(&None, &None),
            cursor: None,
            send_heartbeat: false,
            executor: Arc::new(|_| {
                async move {
                    Ok(SubscribeResult {
                        cursor: SubscriptionCursor::default(),
                        messages: vec![],
                    })
                }
                .boxed()
            }),
            cancellation_channel: tx,
        };

        effect.cancel();

        assert_eq!(rx.recv().await.unwrap(), effect.id());
    }
}
