//! Receive updates effect module.
//!
//! Performs a single long-poll cycle which delivers real-time updates
//! accumulated by the service since the previous cursor.

use futures::TryFutureExt;
use log::info;

use crate::subscribe::{
    event_engine::{
        effects::SubscribeEffectExecutor,
        types::{SubscriptionInput, SubscriptionParams},
        SubscribeEvent,
    },
    SubscriptionCursor,
};

use std::sync::Arc;

pub(super) async fn execute(
    input: &SubscriptionInput,
    cursor: &SubscriptionCursor,
    effect_id: &str,
    executor: &Arc<SubscribeEffectExecutor>,
) -> Vec<SubscribeEvent> {
    let channels = input.channels();
    let channel_groups = input.channel_groups();

    info!(
        "Receive at {:?} for\nchannels: {:?}\nchannel groups: {:?}",
        cursor.timetoken, channels, channel_groups
    );

    executor(SubscriptionParams {
        channels: &channels,
        channel_groups: &channel_groups,
        cursor: Some(cursor),
        send_heartbeat: false,
        effect_id,
    })
    .map_ok_or_else(
        |error| {
            // Cancellation means the effect has been superseded by another
            // transition and nothing should be reported.
            (!error.is_cancellation())
                .then(|| vec![SubscribeEvent::ReceiveFailure { reason: error }])
                .unwrap_or_default()
        },
        |result| {
            vec![SubscribeEvent::ReceiveSuccess {
                cursor: result.cursor,
                messages: result.messages,
            }]
        },
    )
    .await
}
