//! # Subscription module.
//!
//! This module contains the [`Subscription`] type, which is used to manage
//! subscription to a specific entity and attach listener streams processing
//! real-time events triggered for that entity.

use log::info;
use spin::RwLock;
use uuid::Uuid;

use crate::{
    core::{DataStream, FanlineEntity, Transport},
    dx::client::FanlineClientInstance,
    subscribe::{
        event_engine::SubscriptionInput, traits::EventHandler, EventDispatcher, EventEmitter,
        EventSubscriber, Message, SubscribableType, SubscriptionCursor, SubscriptionOptions,
        SubscriptionSet, Update,
    },
};

use std::{
    fmt::{Debug, Formatter, Result},
    ops::{Add, Deref},
    sync::Arc,
};

/// Entity subscription.
///
/// # Example
///
/// ```rust
/// use fanline::{subscribe::{Subscriber, SubscriptionOptions}, Keyset, FanlineClientBuilder};
/// # use fanline::core::{FanlineError, Transport, SubscribeRequest, LeaveRequest, HeartbeatRequest};
/// # use fanline::subscribe::SubscribeResult;
/// #
/// # struct MyTransport;
/// #
/// # #[async_trait::async_trait]
/// # impl Transport for MyTransport {
/// #     async fn subscribe(&self, _: SubscribeRequest) -> Result<SubscribeResult, FanlineError> {
/// #         unimplemented!()
/// #     }
/// #     async fn leave(&self, _: LeaveRequest) -> Result<(), FanlineError> { Ok(()) }
/// #     async fn heartbeat(&self, _: HeartbeatRequest) -> Result<(), FanlineError> { Ok(()) }
/// # }
///
/// # fn main() -> Result<(), FanlineError> {
/// let client = FanlineClientBuilder::with_transport(MyTransport)
///     .with_keyset(Keyset { subscribe_key: "demo" })
///     .with_user_id("user")
///     .build()?;
/// let channel = client.channel("my_channel")?;
/// // Subscription without presence announcements.
/// let subscription = channel.subscription(None);
/// // Subscription with presence announcements.
/// let subscription_with_presence =
///     channel.subscription(Some(vec![SubscriptionOptions::ReceivePresenceEvents]));
/// #     Ok(())
/// # }
/// ```
pub struct Subscription<T> {
    /// Shared subscription state.
    pub(super) inner: Arc<SubscriptionRef<T>>,
}

/// Shared subscription state.
///
/// This struct contains the state shared across all [`Subscription`] clones.
/// It is wrapped in an `Arc` by [`Subscription`] and uses interior mutability
/// for its internal state.
///
/// Not intended to be used directly. Use [`Subscription`] instead.
pub struct SubscriptionRef<T> {
    /// Unique event handler identifier.
    pub(super) id: String,

    /// [`FanlineClientInstance`] which is backing the subscription.
    client: FanlineClientInstance<T>,

    /// Subscribable entity.
    ///
    /// The entity for which real-time updates should be received.
    pub(super) entity: FanlineEntity<T>,

    /// Whether the subscription is currently active.
    is_subscribed: RwLock<bool>,

    /// Names which represent data stream identifiers for the entity's
    /// real-time events.
    pub(super) subscription_input: SubscriptionInput,

    /// Subscription time cursor.
    cursor: RwLock<Option<SubscriptionCursor>>,

    /// Subscription listener options.
    options: Option<Vec<SubscriptionOptions>>,

    /// Real-time events dispatcher.
    event_dispatcher: EventDispatcher,
}

impl<T> Subscription<T>
where
    T: Transport + Send + Sync + 'static,
{
    /// Creates a new subscription for the specified entity.
    pub(crate) fn new(
        client: FanlineClientInstance<T>,
        entity: FanlineEntity<T>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> Self {
        Self {
            inner: Arc::new(SubscriptionRef::new(client, entity, options)),
        }
    }

    /// Subscription options.
    pub(super) fn options(&self) -> Option<Vec<SubscriptionOptions>> {
        self.options.clone()
    }

    fn handler(&self) -> Arc<dyn EventHandler> {
        self.inner.clone()
    }
}

impl<T> Deref for Subscription<T> {
    type Target = SubscriptionRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Add for Subscription<T>
where
    T: Transport + Send + Sync + 'static,
{
    type Output = SubscriptionSet<T>;

    fn add(self, rhs: Self) -> Self::Output {
        let options = self.options();
        SubscriptionSet::new_with_subscriptions(vec![self, rhs], options)
    }
}

impl<T> PartialEq for Subscription<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl<T> Debug for Subscription<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "Subscription {{ id: {}, entity: {:?}, subscription_input: {:?}, is_subscribed: {}, \
            cursor: {:?}, options: {:?} }}",
            self.id,
            self.entity,
            self.subscription_input,
            self.is_subscribed(),
            self.cursor.read().clone(),
            self.options
        )
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        // The shared state outlives this handle when it is still referenced
        // by a subscription set or by another clone.
        if Arc::strong_count(&self.inner) > 1 {
            return;
        }

        self.inner.invalidate_dropped();
    }
}

impl<T> SubscriptionRef<T> {
    fn new(
        client: FanlineClientInstance<T>,
        entity: FanlineEntity<T>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> SubscriptionRef<T> {
        let is_channel_type = matches!(entity.r#type(), SubscribableType::Channel);
        let with_presence = if let Some(options) = &options {
            options
                .iter()
                .any(|option| matches!(option, SubscriptionOptions::ReceivePresenceEvents))
        } else {
            false
        };
        let entity_names = entity.names(with_presence);

        let input = SubscriptionInput::new(
            &is_channel_type.then(|| entity_names.clone()),
            &(!is_channel_type).then_some(entity_names),
        );

        Self {
            id: Uuid::new_v4().to_string(),
            client,
            entity,
            is_subscribed: Default::default(),
            subscription_input: input,
            cursor: Default::default(),
            options,
            event_dispatcher: Default::default(),
        }
    }

    /// Checks whether the [`Subscription`] is active or not.
    pub(super) fn is_subscribed(&self) -> bool {
        *self.is_subscribed.read()
    }

    /// [`FanlineClientInstance`] which is backing the subscription.
    pub(super) fn client(&self) -> &FanlineClientInstance<T> {
        &self.client
    }

    /// The current timetoken value, or 0 when no cursor is stored.
    fn current_timetoken(&self) -> usize {
        self.cursor
            .read()
            .as_ref()
            .map(|cursor| cursor.timetoken_value())
            .unwrap_or(0)
    }

    /// Store `cursor` when it is ahead of the currently stored one.
    fn advance_cursor(&self, cursor: SubscriptionCursor) {
        let mut cursor_slot = self.cursor.write();
        match cursor_slot.as_ref() {
            Some(current_cursor) if !cursor.gt(current_cursor) => {}
            _ => *cursor_slot = Some(cursor),
        }
    }

    /// Events which are intended for this subscription.
    ///
    /// An event passes the filter when its subscription identifier is part
    /// of the subscription input and it didn't happen before the catch-up
    /// cursor.
    fn filtered_events(&self, events: &[Update]) -> Vec<Update> {
        let current_timetoken = self.current_timetoken();

        events
            .iter()
            .filter(|event| {
                self.subscription_input.contains(&event.subscription())
                    && event.event_timestamp().ge(&current_timetoken)
            })
            .cloned()
            .collect()
    }
}

impl<T> SubscriptionRef<T> {
    /// Clean up after the last external handle has been dropped.
    fn invalidate_dropped(&self) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if !*is_subscribed {
                return;
            }
            *is_subscribed = false;
        }

        self.entity.decrease_subscriptions_count();
        self.event_dispatcher.invalidate();

        if let Some(manager) = self.client.existing_subscription_manager() {
            manager.unregister_with_input(&self.id, self.subscription_input.clone());
        }
    }
}

impl<T> EventSubscriber for Subscription<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscribe(&self, cursor: Option<SubscriptionCursor>) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if *is_subscribed {
                return;
            }
            *is_subscribed = true;
        }

        info!("Subscribing {:?}", self.entity);

        if let Some(cursor) = cursor.clone() {
            self.advance_cursor(cursor);
        }

        if let Some(manager) = self.client.subscription_manager(true) {
            // Mark the entity as "in use" by the subscription.
            self.entity.increase_subscriptions_count();
            manager.register(self.handler(), cursor);
        }
    }

    fn unsubscribe(&self) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if !*is_subscribed {
                return;
            }
            *is_subscribed = false;
        }

        info!("Unsubscribing {:?}", self.entity);

        if let Some(manager) = self.client.subscription_manager(false) {
            // Mark the entity as "not in use" by the subscription.
            self.entity.decrease_subscriptions_count();
            manager.unregister(self.handler());
        }
    }
}

impl<T> EventHandler for SubscriptionRef<T>
where
    T: Send + Sync,
{
    fn handle_events(&self, cursor: SubscriptionCursor, events: &[Update]) {
        if !self.is_subscribed() {
            return;
        }

        let filtered_events = self.filtered_events(events);
        self.advance_cursor(cursor);

        self.event_dispatcher.handle_events(filtered_events);
    }

    fn subscription_input(&self, include_inactive: bool) -> SubscriptionInput {
        if !include_inactive && self.entity.subscriptions_count().eq(&0) {
            return Default::default();
        }

        self.subscription_input.clone()
    }

    fn invalidate(&self) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if !*is_subscribed {
                return;
            }
            *is_subscribed = false;
        }

        self.entity.decrease_subscriptions_count();
        self.event_dispatcher.invalidate();
    }

    fn id(&self) -> &String {
        &self.id
    }
}

impl<T> EventEmitter for Subscription<T> {
    fn messages_stream(&self) -> DataStream<Message> {
        self.event_dispatcher.messages_stream()
    }

    fn signals_stream(&self) -> DataStream<Message> {
        self.event_dispatcher.signals_stream()
    }

    fn message_actions_stream(&self) -> DataStream<Message> {
        self.event_dispatcher.message_actions_stream()
    }

    fn objects_stream(&self) -> DataStream<Message> {
        self.event_dispatcher.objects_stream()
    }

    fn files_stream(&self) -> DataStream<Message> {
        self.event_dispatcher.files_stream()
    }

    fn stream(&self) -> DataStream<Update> {
        self.event_dispatcher.stream()
    }
}

#[cfg(test)]
mod it_should {
    use super::*;
    use crate::{dx::client::tests::client, subscribe::Subscriber};

    #[tokio::test]
    async fn create_subscription_from_channel_entity() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription = channel.subscription(None);

        assert!(!subscription.is_subscribed());
        assert!(subscription.subscription_input.contains_channel("channel"));
        assert!(!subscription
            .subscription_input
            .contains_channel("channel-pnpres"));
    }

    #[tokio::test]
    async fn create_subscription_from_channel_entity_with_presence() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription =
            channel.subscription(Some(vec![SubscriptionOptions::ReceivePresenceEvents]));

        assert!(subscription.subscription_input.contains_channel("channel"));
        assert!(subscription
            .subscription_input
            .contains_channel("channel-pnpres"));
    }

    #[tokio::test]
    async fn create_subscription_from_channel_group_entity() {
        let client = client();
        let channel_group = client.channel_group("channel-group").unwrap();
        let subscription = channel_group.subscription(None);

        assert!(subscription
            .subscription_input
            .contains_channel_group("channel-group"));
        assert!(!subscription
            .subscription_input
            .contains_channel("channel-group"));
    }

    #[tokio::test]
    async fn preserve_id_between_clones() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription = channel.subscription(None);

        assert_eq!(subscription.clone().id.clone(), subscription.id.clone());
    }

    #[tokio::test]
    async fn filter_events_by_subscription_input() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription = channel.subscription(None);

        let events = vec![
            Update::Message(Message {
                sender: None,
                timestamp: 10,
                channel: "channel".into(),
                subscription: "channel".into(),
                data: vec![],
                flags: 0,
            }),
            Update::Message(Message {
                sender: None,
                timestamp: 10,
                channel: "other-channel".into(),
                subscription: "other-channel".into(),
                data: vec![],
                flags: 0,
            }),
        ];

        let filtered = subscription.filtered_events(&events);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].subscription(), "channel");
    }

    #[tokio::test]
    async fn filter_events_which_happened_before_catchup_cursor() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription = channel.subscription(None);
        subscription.advance_cursor(SubscriptionCursor::from(100u64));

        let event = |timestamp: usize| {
            Update::Message(Message {
                sender: None,
                timestamp,
                channel: "channel".into(),
                subscription: "channel".into(),
                data: vec![],
                flags: 0,
            })
        };

        let filtered = subscription.filtered_events(&[event(99), event(100), event(101)]);

        assert_eq!(filtered.len(), 2);
    }

    #[tokio::test]
    async fn track_entity_usage_on_subscribe_and_unsubscribe() {
        let client = client();
        let channel = client.channel("channel").unwrap();
        let subscription = channel.subscription(None);

        subscription.subscribe(None);
        assert!(subscription.is_subscribed());
        assert_eq!(subscription.entity.subscriptions_count(), 1);

        subscription.unsubscribe();
        assert!(!subscription.is_subscribed());
        assert_eq!(subscription.entity.subscriptions_count(), 0);
    }
}
