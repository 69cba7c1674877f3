use async_channel::Sender;

use crate::{
    core::event_engine::EffectHandler,
    subscribe::event_engine::{
        effects::{EmitMessagesEffectExecutor, EmitStatusEffectExecutor, SubscribeEffectExecutor},
        SubscribeEffect, SubscribeEffectInvocation,
    },
};

use std::{
    fmt::{Debug, Formatter, Result},
    sync::Arc,
};

/// Subscribe effect handler.
///
/// Handler responsible for creation of effects in response to effect
/// invocations. Actual implementations are provided by the client through
/// executor functions.
pub(crate) struct SubscribeEffectHandler {
    /// Subscribe call function pointer.
    subscribe_call: Arc<SubscribeEffectExecutor>,

    /// Emit status function pointer.
    emit_status: Arc<EmitStatusEffectExecutor>,

    /// Emit messages function pointer.
    emit_messages: Arc<EmitMessagesEffectExecutor>,

    /// Cancellation channel.
    cancellation_channel: Sender<String>,
}

impl SubscribeEffectHandler {
    /// Create subscribe effect handler.
    pub fn new(
        subscribe_call: Arc<SubscribeEffectExecutor>,
        emit_status: Arc<EmitStatusEffectExecutor>,
        emit_messages: Arc<EmitMessagesEffectExecutor>,
        cancellation_channel: Sender<String>,
    ) -> Self {
        SubscribeEffectHandler {
            subscribe_call,
            emit_status,
            emit_messages,
            cancellation_channel,
        }
    }
}

impl EffectHandler<SubscribeEffectInvocation, SubscribeEffect> for SubscribeEffectHandler {
    fn create(&self, invocation: &SubscribeEffectInvocation) -> Option<SubscribeEffect> {
        match invocation {
            SubscribeEffectInvocation::Handshake {
                input,
                cursor,
                send_heartbeat,
            } => Some(SubscribeEffect::Handshake {
                id: SubscribeEffect::unique_id(),
                input: input.clone(),
                cursor: cursor.clone(),
                send_heartbeat: *send_heartbeat,
                executor: self.subscribe_call.clone(),
                cancellation_channel: self.cancellation_channel.clone(),
            }),
            SubscribeEffectInvocation::Receive { input, cursor } => {
                Some(SubscribeEffect::Receive {
                    id: SubscribeEffect::unique_id(),
                    input: input.clone(),
                    cursor: cursor.clone(),
                    executor: self.subscribe_call.clone(),
                    cancellation_channel: self.cancellation_channel.clone(),
                })
            }
            SubscribeEffectInvocation::EmitStatus(status) => Some(SubscribeEffect::EmitStatus {
                id: SubscribeEffect::unique_id(),
                status: status.clone(),
                executor: self.emit_status.clone(),
            }),
            SubscribeEffectInvocation::EmitMessages(messages, cursor) => {
                Some(SubscribeEffect::EmitMessages {
                    id: SubscribeEffect::unique_id(),
                    next_cursor: cursor.clone(),
                    updates: messages.clone(),
                    executor: self.emit_messages.clone(),
                })
            }
            _ => None,
        }
    }
}

impl Debug for SubscribeEffectHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "SubscribeEffectHandler {{}}")
    }
}
