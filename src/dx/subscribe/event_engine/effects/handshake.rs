//! Handshake effect module.
//!
//! Performs the initial subscription which establishes the subscription loop
//! for the current set of channels and channel groups.

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
    cursor: &Option<SubscriptionCursor>,
    send_heartbeat: bool,
    effect_id: &str,
    executor: &Arc<SubscribeEffectExecutor>,
) -> Vec<SubscribeEvent> {
    let channels = input.channels();
    let channel_groups = input.channel_groups();

    info!(
        "Handshake for\nchannels: {:?}\nchannel groups: {:?}\ncatch up cursor: {:?}",
        channels, channel_groups, cursor
    );

    // The initial subscription always starts at the head of the stream; a
    // stored catch-up cursor is merged into the subscription loop only after
    // the handshake succeeded.
    executor(SubscriptionParams {
        channels: &channels,
        channel_groups: &channel_groups,
        cursor: None,
        send_heartbeat,
        effect_id,
    })
    .map_ok_or_else(
        |error| {
            // Cancellation means the effect has been superseded by another
            // transition and nothing should be reported.
            (!error.is_cancellation())
                .then(|| vec![SubscribeEvent::HandshakeFailure { reason: error }])
                .unwrap_or_default()
        },
        |result| {
            vec![SubscribeEvent::HandshakeSuccess {
                cursor: result.cursor,
            }]
        },
    )
    .await
}

#[cfg(test)]
mod should {
    use super::*;
    use crate::{core::FanlineError, subscribe::result::SubscribeResult};
    use futures::FutureExt;

    fn input() -> SubscriptionInput {
        SubscriptionInput::new(
            &Some(vec!["ch1".to_string()]),
            &Some(vec!["cg1".to_string()]),
        )
    }

    #[tokio::test]
    async fn return_handshake_success_event() {
        let mocked_executor: Arc<SubscribeEffectExecutor> = Arc::new(move |params| {
            assert_eq!(params.channels, &Some(vec!["ch1".to_string()]));
            assert_eq!(params.channel_groups, &Some(vec!["cg1".to_string()]));
            // Catch-up cursor stays out of the initial subscription call.
            assert!(params.cursor.is_none());
            assert!(!params.send_heartbeat);
            assert_eq!(params.effect_id, "id");

            async move {
                Ok(SubscribeResult {
                    cursor: SubscriptionCursor::from(10u64),
                    messages: vec![],
                })
            }
            .boxed()
        });

        let result = execute(
            &input(),
            &Some(SubscriptionCursor::from(25u64)),
            false,
            "id",
            &mocked_executor,
        )
        .await;

        assert!(matches!(
            result.first().unwrap(),
            SubscribeEvent::HandshakeSuccess { .. }
        ));
    }

    #[tokio::test]
    async fn return_handshake_failure_event_on_error() {
        let mocked_executor: Arc<SubscribeEffectExecutor> = Arc::new(move |_| {
            async move {
                Err(FanlineError::Transport {
                    details: "test".into(),
                })
            }
            .boxed()
        });

        let result = execute(&input(), &None, true, "id", &mocked_executor).await;

        assert!(matches!(
            result.first().unwrap(),
            SubscribeEvent::HandshakeFailure { .. }
        ));
    }

    #[tokio::test]
    async fn return_no_events_on_cancellation() {
        let mocked_executor: Arc<SubscribeEffectExecutor> =
            Arc::new(move |_| async move { Err(FanlineError::EffectCanceled) }.boxed());

        let result = execute(&input(), &None, false, "id", &mocked_executor).await;

        assert!(result.is_empty());
    }
}
