//! Subscribe module.
//!
//! Allows subscription to real-time updates from a list of channels and
//! channel groups and attaching listener streams to the client, individual
//! subscriptions and subscription sets.

use futures::{
    future::{select, Either},
    FutureExt,
};
use log::error;

use crate::{
    core::{
        event_engine::CancellationTask, DataStream, FanlineError, SubscribeRequest, Transport,
    },
    dx::{
        client::FanlineClientInstance,
        presence::{HeartbeatEffectExecutor, LeaveEffectExecutor, PresenceManager},
    },
};

use std::sync::Arc;

#[doc(inline)]
pub use result::{Envelope, SubscribeResult, Update};
pub mod result;

#[doc(inline)]
pub use types::{
    ConnectionStatus, EnvelopeMessageType, Message, SubscribeStreamEvent, SubscriptionCursor,
    SubscriptionOptions,
};
pub mod types;

#[doc(inline)]
pub use traits::{EventEmitter, EventSubscriber, Subscribable, SubscribableType, Subscriber};
pub(crate) mod traits;

#[doc(inline)]
pub use subscription::Subscription;
pub mod subscription;

#[doc(inline)]
pub use subscription_set::SubscriptionSet;
pub mod subscription_set;

pub(crate) use subscription_manager::{LeaveTracker, SubscriptionManager};
pub(crate) mod subscription_manager;

pub(crate) use event_dispatcher::EventDispatcher;
pub(crate) mod event_dispatcher;

pub(crate) mod event_engine;
use event_engine::{
    effects::{EmitMessagesEffectExecutor, EmitStatusEffectExecutor, SubscribeEffectExecutor},
    SubscribeEffectHandler, SubscribeEventEngine, SubscribeState,
};

/// Presence companion channel name suffix.
///
/// Subscribables with this suffix deliver presence events for the
/// corresponding regular channel or group; presence announcements themselves
/// are made only for the regular names.
const PRESENCE_CHANNEL_SUFFIX: &str = "-pnpres";

/// Drop presence companion names from the list.
fn non_presence_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !name.ends_with(PRESENCE_CHANNEL_SUFFIX))
        .collect()
}

impl<T> FanlineClientInstance<T>
where
    T: Transport + Send + Sync + 'static,
{
    /// Temporarily stop receiving real-time updates.
    ///
    /// The set of active subscriptions is preserved and can be restored with
    /// [`reconnect`].
    ///
    /// [`reconnect`]: FanlineClientInstance::reconnect
    pub fn disconnect(&self) {
        if let Some(manager) = self.existing_subscription_manager() {
            manager.disconnect();
        }
    }

    /// Restore receiving of real-time updates.
    ///
    /// An optional `cursor` makes the restored subscription loop catch up on
    /// updates from a specific point in time.
    pub fn reconnect(&self, cursor: Option<SubscriptionCursor>) {
        if let Some(manager) = self.existing_subscription_manager() {
            manager.reconnect(cursor);
        }
    }

    /// Unsubscribe from everything.
    ///
    /// All registered subscriptions and subscription sets are invalidated
    /// and the service is notified that the client left all previously
    /// active channels and channel groups.
    pub fn unsubscribe_all(&self) {
        if let Some(manager) = self.existing_subscription_manager() {
            manager.unsubscribe_all();
        }
    }

    /// Stream with client connection status changes.
    pub fn status_stream(&self) -> DataStream<ConnectionStatus> {
        self.global_event_dispatcher().status_stream()
    }

    /// Stream which delivers every real-time update received by the client.
    pub fn stream(&self) -> DataStream<Update> {
        self.global_event_dispatcher().stream()
    }

    /// Stream with real-time messages received by the client.
    pub fn messages_stream(&self) -> DataStream<Message> {
        self.global_event_dispatcher().messages_stream()
    }

    /// Stream with real-time signals received by the client.
    pub fn signals_stream(&self) -> DataStream<Message> {
        self.global_event_dispatcher().signals_stream()
    }

    fn global_event_dispatcher(&self) -> Arc<EventDispatcher> {
        self.subscription_manager_or_create().event_dispatcher()
    }

    /// Subscription module.
    ///
    /// With `create_if_missing` the module is initialized on first demand;
    /// access paths which only react to the module's existence (leave
    /// announcements, termination) pass `false`.
    pub(crate) fn subscription_manager(
        &self,
        create_if_missing: bool,
    ) -> Option<Arc<SubscriptionManager>> {
        if let Some(manager) = self.subscription.read().clone() {
            return Some(manager);
        }

        create_if_missing.then(|| self.subscription_manager_or_create())
    }

    /// Subscription module, initialized on first demand.
    pub(crate) fn subscription_manager_or_create(&self) -> Arc<SubscriptionManager> {
        let mut manager_slot = self.subscription.write();
        if let Some(manager) = manager_slot.clone() {
            return manager;
        }

        let manager = self.build_subscription_manager();
        *manager_slot = Some(manager.clone());
        manager
    }

    /// Assemble the subscription module.
    ///
    /// Wires the subscribe event engine with executor functions backed by
    /// this client instance, the presence manager and the leave coordination
    /// machinery.
    fn build_subscription_manager(&self) -> Arc<SubscriptionManager> {
        let channel_bound = 10;
        let runtime = self.runtime().clone();
        let (cancel_tx, cancel_rx) = async_channel::bounded::<String>(channel_bound);

        let leave_tracker = Arc::new(LeaveTracker::new());
        let client = self.downgrade();

        let leave_call: Arc<LeaveEffectExecutor> = {
            let client = client.clone();
            Arc::new(move |channels, channel_groups| {
                let client = client.clone();
                async move {
                    let Some(client) = client.upgrade().map(FanlineClientInstance::from) else {
                        return;
                    };
                    client.leave_request(channels, channel_groups).await;
                }
                .boxed()
            })
        };

        let heartbeat_call: Arc<HeartbeatEffectExecutor> = {
            let client = client.clone();
            Arc::new(move |channels, channel_groups| {
                let client = client.clone();
                async move {
                    let Some(client) = client.upgrade().map(FanlineClientInstance::from) else {
                        return Err(FanlineError::EffectCanceled);
                    };
                    client.heartbeat_request(channels, channel_groups).await
                }
                .boxed()
            })
        };

        let presence_manager = PresenceManager::new(
            heartbeat_call.clone(),
            self.config().heartbeat_interval,
            runtime.clone(),
        );

        let subscribe_call: Arc<SubscribeEffectExecutor> = {
            let client = client.clone();
            let leave_tracker = leave_tracker.clone();
            let leave_call = leave_call.clone();
            let heartbeat_call = heartbeat_call.clone();

            Arc::new(move |params| {
                let channels = params.channels.clone().unwrap_or_default();
                let channel_groups = params.channel_groups.clone().unwrap_or_default();
                let cursor = params.cursor.cloned().unwrap_or_default();
                let send_heartbeat = params.send_heartbeat;
                let cancel_task = CancellationTask::new(cancel_rx.clone(), params.effect_id.to_owned());

                let client = client.clone();
                let leave_tracker = leave_tracker.clone();
                let leave_call = leave_call.clone();
                let heartbeat_call = heartbeat_call.clone();

                async move {
                    let Some(client) = client.upgrade().map(FanlineClientInstance::from) else {
                        return Err(FanlineError::EffectCanceled);
                    };

                    // The heartbeat round-trip belongs to the same in-flight
                    // window as the subscribe call which follows it: leave
                    // requests arriving at any point of the sequence must be
                    // queued until the transaction completes.
                    let was_idle = leave_tracker.is_idle();
                    leave_tracker.begin_transaction();

                    // User-initiated subscription changes announce presence
                    // before the long-poll starts. Skipped when another
                    // transaction was already in flight.
                    if send_heartbeat && was_idle {
                        if let Err(err) = heartbeat_call(
                            non_presence_names(channels.clone()),
                            non_presence_names(channel_groups.clone()),
                        )
                        .await
                        {
                            error!("Presence heartbeat failed: {err}");
                        }
                    }

                    let result = client
                        .subscribe_request(channels, channel_groups, cursor, cancel_task)
                        .await;

                    // Leave announcements requested while the call was in
                    // flight fire once it completes (or is cancelled).
                    if let Some((channels, channel_groups)) = leave_tracker.end_transaction() {
                        leave_call(channels, channel_groups).await;
                    }

                    result
                }
                .boxed()
            })
        };

        let emit_status: Arc<EmitStatusEffectExecutor> = {
            let client = client.clone();
            Arc::new(move |status| {
                let Some(client) = client.upgrade().map(FanlineClientInstance::from) else {
                    return;
                };
                if let Some(manager) = client.existing_subscription_manager() {
                    manager.notify_new_status(status);
                }
            })
        };

        let emit_messages: Arc<EmitMessagesEffectExecutor> = {
            let client = client.clone();
            Arc::new(move |envelopes, cursor| {
                let Some(client) = client.upgrade().map(FanlineClientInstance::from) else {
                    return;
                };
                if let Some(manager) = client.existing_subscription_manager() {
                    let updates = envelopes.into_iter().map(Update::from).collect();
                    manager.notify_new_messages(cursor, updates);
                }
            })
        };

        let engine = SubscribeEventEngine::new(
            SubscribeEffectHandler::new(subscribe_call, emit_status, emit_messages, cancel_tx),
            SubscribeState::Unsubscribed,
            runtime.clone(),
        );

        Arc::new(SubscriptionManager::new(
            engine,
            presence_manager,
            leave_tracker,
            leave_call,
            runtime,
        ))
    }

    /// Perform a long-poll subscribe call.
    ///
    /// The call races against the cancellation task; a cancelled call
    /// resolves to [`FanlineError::EffectCanceled`].
    async fn subscribe_request(
        &self,
        mut channels: Vec<String>,
        mut channel_groups: Vec<String>,
        cursor: SubscriptionCursor,
        cancel_task: CancellationTask,
    ) -> Result<SubscribeResult, FanlineError> {
        channels.sort();
        channel_groups.sort();

        let request = SubscribeRequest {
            channels,
            channel_groups,
            cursor,
            filter_expression: self.filter_expression(),
            heartbeat: self.heartbeat_value(),
        };

        let call = Box::pin(self.transport().subscribe(request));
        let cancel = Box::pin(cancel_task.wait_for_cancel());

        match select(call, cancel).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => Err(FanlineError::EffectCanceled),
        }
    }

    /// Announce leave for channels and channel groups.
    ///
    /// Presence companion names never reach the service; failures are logged
    /// because nothing in the subscription loop depends on the outcome.
    async fn leave_request(&self, channels: Vec<String>, channel_groups: Vec<String>) {
        let mut channels = non_presence_names(channels);
        let mut channel_groups = non_presence_names(channel_groups);
        channels.sort();
        channel_groups.sort();

        if channels.is_empty() && channel_groups.is_empty() {
            return;
        }

        let request = crate::core::LeaveRequest {
            channels,
            channel_groups,
        };

        if let Err(err) = self.transport().leave(request).await {
            error!("Leave announcement failed: {err}");
        }
    }

    /// Announce presence for channels and channel groups.
    async fn heartbeat_request(
        &self,
        channels: Vec<String>,
        channel_groups: Vec<String>,
    ) -> Result<(), FanlineError> {
        let mut channels = non_presence_names(channels);
        let mut channel_groups = non_presence_names(channel_groups);
        channels.sort();
        channel_groups.sort();

        if channels.is_empty() && channel_groups.is_empty() {
            return Ok(());
        }

        let request = crate::core::HeartbeatRequest {
            channels,
            channel_groups,
            heartbeat: self.heartbeat_value(),
        };

        self.transport().heartbeat(request).await
    }
}

#[cfg(test)]
mod should {
    use super::*;
    use crate::{
        core::{HeartbeatRequest, LeaveRequest},
        FanlineClientBuilder, Keyset,
    };
    use futures::StreamExt;
    use spin::Mutex;
    use std::collections::VecDeque;
    use tokio::time::{timeout, Duration};

    #[derive(Debug)]
    enum ScriptedResponse {
        Success {
            cursor: SubscriptionCursor,
            messages: Vec<Envelope>,
        },
        Failure(FanlineError),
    }

    #[derive(Default)]
    struct ScriptedState {
        responses: Mutex<VecDeque<ScriptedResponse>>,
        subscribe_requests: Mutex<Vec<SubscribeRequest>>,
        leave_requests: Mutex<Vec<LeaveRequest>>,
        heartbeat_requests: Mutex<Vec<HeartbeatRequest>>,

        /// When set, the next heartbeat call stays in flight until the test
        /// sends a release notification.
        heartbeat_release: Mutex<Option<async_channel::Receiver<()>>>,
    }

    impl ScriptedState {
        fn push_response(&self, response: ScriptedResponse) {
            self.responses.lock().push_back(response);
        }

        fn subscribe_request(&self, index: usize) -> Option<SubscribeRequest> {
            self.subscribe_requests.lock().get(index).cloned()
        }

        fn hold_next_heartbeat(&self) -> async_channel::Sender<()> {
            let (release_tx, release_rx) = async_channel::bounded::<()>(1);
            *self.heartbeat_release.lock() = Some(release_rx);
            release_tx
        }
    }

    struct ScriptedTransport {
        state: Arc<ScriptedState>,
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn subscribe(
            &self,
            request: SubscribeRequest,
        ) -> Result<SubscribeResult, FanlineError> {
            self.state.subscribe_requests.lock().push(request);

            let response = self.state.responses.lock().pop_front();
            match response {
                Some(ScriptedResponse::Success { cursor, messages }) => {
                    Ok(SubscribeResult { cursor, messages })
                }
                Some(ScriptedResponse::Failure(reason)) => Err(reason),
                // No scripted response: behave like a held long-poll.
                None => futures::future::pending().await,
            }
        }

        async fn leave(&self, request: LeaveRequest) -> Result<(), FanlineError> {
            self.state.leave_requests.lock().push(request);
            Ok(())
        }

        async fn heartbeat(&self, request: HeartbeatRequest) -> Result<(), FanlineError> {
            self.state.heartbeat_requests.lock().push(request);

            let release = self.state.heartbeat_release.lock().take();
            if let Some(release) = release {
                let _ = release.recv().await;
            }

            Ok(())
        }
    }

    fn client_with_script(
        responses: Vec<ScriptedResponse>,
    ) -> (
        crate::FanlineClientInstance<ScriptedTransport>,
        Arc<ScriptedState>,
    ) {
        let state = Arc::new(ScriptedState::default());
        responses
            .into_iter()
            .for_each(|response| state.push_response(response));

        let client = FanlineClientBuilder::with_transport(ScriptedTransport {
            state: state.clone(),
        })
        .with_keyset(Keyset {
            subscribe_key: "demo",
        })
        .with_user_id("user")
        .build()
        .expect("Client should be created");

        (client, state)
    }

    fn success(timetoken: u64, messages: Vec<Envelope>) -> ScriptedResponse {
        ScriptedResponse::Success {
            cursor: SubscriptionCursor::from(timetoken),
            messages,
        }
    }

    fn envelope(channel: &str, timetoken: u64) -> Envelope {
        Envelope {
            channel: channel.to_string(),
            subscription: None,
            message_type: EnvelopeMessageType::Published,
            payload: b"payload".to_vec(),
            sender: Some("another-user".into()),
            published: SubscriptionCursor::from(timetoken),
            flags: 0,
        }
    }

    async fn next_with_timeout<S>(stream: &mut S) -> Option<S::Item>
    where
        S: futures::Stream + Unpin,
    {
        timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("Expected event hasn't been received in time")
    }

    async fn wait_until<C>(condition: C)
    where
        C: Fn() -> bool,
    {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("Expected condition hasn't been met in time");
    }

    #[test]
    fn drop_presence_companion_names() {
        let names = vec![
            "ch1".to_string(),
            "ch1-pnpres".to_string(),
            "ch2".to_string(),
        ];

        assert_eq!(
            non_presence_names(names),
            vec!["ch1".to_string(), "ch2".to_string()]
        );
    }

    #[tokio::test]
    async fn connect_and_deliver_messages() {
        let (client, state) = client_with_script(vec![
            success(10, vec![]),
            success(20, vec![envelope("ch1", 15)]),
        ]);

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);
        let mut statuses = client.status_stream();
        let mut messages = subscription.messages_stream();

        subscription.subscribe(None);

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));

        let message = next_with_timeout(&mut messages).await.unwrap();
        assert_eq!(message.channel, "ch1");
        assert_eq!(message.data, b"payload".to_vec());

        // Initial subscription starts at the head of the stream, the
        // subscription loop continues from service-provided cursors.
        wait_until(|| state.subscribe_request(2).is_some()).await;
        let handshake = state.subscribe_request(0).unwrap();
        assert_eq!(handshake.channels, vec!["ch1".to_string()]);
        assert_eq!(handshake.cursor.timetoken, "0");
        assert_eq!(state.subscribe_request(1).unwrap().cursor.timetoken, "10");
        assert_eq!(state.subscribe_request(2).unwrap().cursor.timetoken, "20");
    }

    #[tokio::test]
    async fn fan_out_presence_subscribables() {
        let (client, state) = client_with_script(vec![]);

        let channel = client.channel("ch1").unwrap();
        let subscription =
            channel.subscription(Some(vec![SubscriptionOptions::ReceivePresenceEvents]));

        subscription.subscribe(None);

        wait_until(|| state.subscribe_request(0).is_some()).await;
        assert_eq!(
            state.subscribe_request(0).unwrap().channels,
            vec!["ch1".to_string(), "ch1-pnpres".to_string()]
        );
    }

    #[tokio::test]
    async fn announce_presence_before_user_initiated_handshake() {
        let (client, state) = client_with_script(vec![]);

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);

        subscription.subscribe(None);

        wait_until(|| !state.heartbeat_requests.lock().is_empty()).await;
        let heartbeat = state.heartbeat_requests.lock().first().cloned().unwrap();
        assert_eq!(heartbeat.channels, vec!["ch1".to_string()]);

        // Presence announcement completes before the long-poll starts.
        assert!(state.subscribe_request(0).is_some());
    }

    #[tokio::test]
    async fn queue_leave_requested_while_heartbeat_in_flight() {
        let (client, state) = client_with_script(vec![]);
        let release_heartbeat = state.hold_next_heartbeat();

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);

        subscription.subscribe(None);

        // The pre-handshake presence announcement keeps the transaction slot
        // occupied, so the leave for the unsubscribed channel must be queued
        // instead of being sent right away.
        wait_until(|| !state.heartbeat_requests.lock().is_empty()).await;
        subscription.unsubscribe();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.leave_requests.lock().is_empty());

        release_heartbeat.send(()).await.unwrap();

        wait_until(|| !state.leave_requests.lock().is_empty()).await;
        assert_eq!(
            state.leave_requests.lock().first().cloned().unwrap().channels,
            vec!["ch1".to_string()]
        );
    }

    #[tokio::test]
    async fn leave_abandoned_channels_on_unsubscribe() {
        let (client, state) = client_with_script(vec![success(10, vec![])]);

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);
        let mut statuses = client.status_stream();

        subscription.subscribe(None);
        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));

        subscription.unsubscribe();

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Disconnected)
        ));

        wait_until(|| !state.leave_requests.lock().is_empty()).await;
        let leave = state.leave_requests.lock().first().cloned().unwrap();
        assert_eq!(leave.channels, vec!["ch1".to_string()]);
    }

    #[tokio::test]
    async fn report_failure_and_recover_on_reconnect() {
        let (client, state) = client_with_script(vec![
            success(10, vec![]),
            ScriptedResponse::Failure(FanlineError::Timeout {
                details: "subscribe".into(),
            }),
        ]);

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);
        let mut statuses = client.status_stream();

        subscription.subscribe(None);

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));
        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::DisconnectedUnexpectedly(
                FanlineError::Timeout { .. }
            ))
        ));

        // No implicit retries: the loop stays parked until an explicit
        // reconnect.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.subscribe_requests.lock().len(), 2);

        state.push_response(success(999, vec![]));
        client.reconnect(None);

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));

        // The subscription loop continues from the last known cursor.
        wait_until(|| state.subscribe_request(3).is_some()).await;
        assert_eq!(state.subscribe_request(2).unwrap().cursor.timetoken, "0");
        assert_eq!(state.subscribe_request(3).unwrap().cursor.timetoken, "10");
    }

    #[tokio::test]
    async fn resubscribe_with_preserved_cursor_on_set_change() {
        let (client, state) = client_with_script(vec![success(10, vec![])]);

        let entities = vec![
            client.channel("ch1").unwrap().into(),
            client.channel("ch2").unwrap().into(),
        ];
        let set = client.subscription_set(entities, None);
        let mut statuses = client.status_stream();

        set.subscribe(None);
        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));

        state.push_response(success(50, vec![]));
        SubscriptionSet::add(&set, client.channel("ch3").unwrap().subscription(None))
            .unwrap();

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::SubscriptionChanged { .. })
        ));

        // Subscription change restarts the loop with the expanded set of
        // subscribables and the already known cursor.
        wait_until(|| state.subscribe_request(3).is_some()).await;
        let changed_handshake = state.subscribe_request(2).unwrap();
        assert_eq!(
            changed_handshake.channels,
            vec!["ch1".to_string(), "ch2".to_string(), "ch3".to_string()]
        );
        assert_eq!(state.subscribe_request(3).unwrap().cursor.timetoken, "10");
    }

    #[tokio::test]
    async fn leave_everything_on_unsubscribe_all() {
        let (client, state) = client_with_script(vec![success(10, vec![])]);

        let channel = client.channel("ch1").unwrap();
        let subscription = channel.subscription(None);
        let mut statuses = client.status_stream();

        subscription.subscribe(None);
        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Connected)
        ));

        client.unsubscribe_all();

        assert!(matches!(
            next_with_timeout(&mut statuses).await,
            Some(ConnectionStatus::Disconnected)
        ));
        assert!(!subscription.is_subscribed());

        wait_until(|| !state.leave_requests.lock().is_empty()).await;
        assert_eq!(
            state.leave_requests.lock().first().cloned().unwrap().channels,
            vec!["ch1".to_string()]
        );
    }
}
