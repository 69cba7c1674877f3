//! Emit status effect module.

use crate::subscribe::{
    event_engine::{effects::EmitStatusEffectExecutor, SubscribeEvent},
    ConnectionStatus,
};

use std::sync::Arc;

pub(super) fn execute(
    status: ConnectionStatus,
    executor: &Arc<EmitStatusEffectExecutor>,
) -> Vec<SubscribeEvent> {
    executor(status);

    vec![]
}
