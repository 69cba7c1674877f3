//! Emit messages effect module.

use crate::subscribe::{
    event_engine::{effects::EmitMessagesEffectExecutor, SubscribeEvent},
    result::Envelope,
    SubscriptionCursor,
};

use std::sync::Arc;

pub(super) fn execute(
    cursor: SubscriptionCursor,
    updates: Vec<Envelope>,
    executor: &Arc<EmitMessagesEffectExecutor>,
) -> Vec<SubscribeEvent> {
    executor(updates, cursor);

    vec![]
}
