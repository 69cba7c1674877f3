//! # Subscription set module.
//!
//! This module contains the [`SubscriptionSet`] type, which can be used to
//! manage subscription to a group of entities and attach listener streams to
//! process real-time events triggered for those entities.

use log::info;
use spin::RwLock;
use uuid::Uuid;

use crate::{
    core::{DataStream, FanlineEntity, FanlineError, Transport},
    dx::client::FanlineClientInstance,
    subscribe::{
        event_engine::SubscriptionInput, traits::EventHandler, EventDispatcher, EventEmitter,
        EventSubscriber, Message, SubscribableType, Subscriber, Subscription, SubscriptionCursor,
        SubscriptionOptions, Update,
    },
};

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::{Add, Deref},
    sync::Arc,
};

/// Entities subscription set.
///
/// A set is an unordered unique collection of subscriptions (keyed by their
/// entity identifier) which can be subscribed and listened to as a whole.
pub struct SubscriptionSet<T> {
    /// Shared subscription set state.
    pub(super) inner: Arc<SubscriptionSetRef<T>>,
}

/// Shared subscription set state.
///
/// Not intended to be used directly. Use [`SubscriptionSet`] instead.
pub struct SubscriptionSetRef<T> {
    /// Unique event handler identifier.
    pub(super) id: String,

    /// [`FanlineClientInstance`] which is backing the subscription set.
    client: FanlineClientInstance<T>,

    /// Subscriptions which are part of the set.
    subscriptions: RwLock<Vec<Subscription<T>>>,

    /// Whether the set is currently active in the subscription loop.
    is_subscribed: RwLock<bool>,

    /// Subscription set time cursor.
    cursor: RwLock<Option<SubscriptionCursor>>,

    /// Subscription set listener options.
    ///
    /// Set options override the options of its members when the aggregated
    /// subscription input is computed.
    options: Option<Vec<SubscriptionOptions>>,

    /// Real-time events dispatcher.
    event_dispatcher: EventDispatcher,
}

impl<T> SubscriptionSet<T>
where
    T: Transport + Send + Sync + 'static,
{
    /// Creates a subscription set from a list of entities.
    pub(crate) fn new(
        client: FanlineClientInstance<T>,
        entities: Vec<FanlineEntity<T>>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> Self {
        let subscriptions = entities
            .into_iter()
            .map(|entity| entity.subscription(options.clone()))
            .collect();

        Self::new_with_subscriptions_and_client(client, subscriptions, options)
    }

    /// Creates a subscription set from a pair (or more) of existing
    /// subscriptions.
    pub(crate) fn new_with_subscriptions(
        subscriptions: Vec<Subscription<T>>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> Self {
        let client = subscriptions
            .first()
            .map(|subscription| subscription.client().clone())
            .expect("Subscription set can't be created without subscriptions");

        Self::new_with_subscriptions_and_client(client, subscriptions, options)
    }

    fn new_with_subscriptions_and_client(
        client: FanlineClientInstance<T>,
        subscriptions: Vec<Subscription<T>>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> Self {
        let mut unique_subscriptions: Vec<Subscription<T>> = Vec::new();
        subscriptions.into_iter().for_each(|subscription| {
            let duplicate = unique_subscriptions
                .iter()
                .any(|existing| existing.entity.id().eq(&subscription.entity.id()));
            if !duplicate {
                unique_subscriptions.push(subscription);
            }
        });

        Self {
            inner: Arc::new(SubscriptionSetRef {
                id: Uuid::new_v4().to_string(),
                client,
                subscriptions: RwLock::new(unique_subscriptions),
                is_subscribed: Default::default(),
                cursor: Default::default(),
                options,
                event_dispatcher: Default::default(),
            }),
        }
    }

    /// Add a subscription to the set.
    ///
    /// When the set is active in the subscription loop, the added entity
    /// becomes part of the loop right away.
    ///
    /// # Errors
    ///
    /// Returns [`FanlineError::SubscriptionAlreadyExists`] when a
    /// subscription with the same entity identifier is already part of the
    /// set. The set is not changed in this case.
    pub fn add(&self, subscription: Subscription<T>) -> Result<(), FanlineError> {
        {
            let mut subscriptions = self.subscriptions.write();
            let entity_id = subscription.entity.id();

            if subscriptions
                .iter()
                .any(|existing| existing.entity.id().eq(&entity_id))
            {
                return Err(FanlineError::SubscriptionAlreadyExists {
                    details: format!("Subscription for '{entity_id}' already in the set"),
                });
            }

            if self.is_subscribed() {
                subscription.entity.increase_subscriptions_count();
            }

            subscriptions.push(subscription);
        }

        if self.is_subscribed() {
            if let Some(manager) = self.client.subscription_manager(false) {
                manager.membership_changed(None);
            }
        }

        Ok(())
    }

    /// Remove a subscription from the set.
    ///
    /// # Errors
    ///
    /// Returns [`FanlineError::SubscriptionNotFound`] when no subscription
    /// with a matching entity identifier is part of the set.
    pub fn remove(&self, subscription: &Subscription<T>) -> Result<(), FanlineError> {
        let removed = {
            let mut subscriptions = self.subscriptions.write();
            let entity_id = subscription.entity.id();

            let position = subscriptions
                .iter()
                .position(|existing| existing.entity.id().eq(&entity_id))
                .ok_or_else(|| FanlineError::SubscriptionNotFound {
                    details: format!("Subscription for '{entity_id}' is not part of the set"),
                })?;

            subscriptions.remove(position)
        };

        if self.is_subscribed() {
            removed.entity.decrease_subscriptions_count();

            if let Some(manager) = self.client.subscription_manager(false) {
                manager.membership_changed(Some(self.member_input(&removed)));
            }
        }

        Ok(())
    }

    /// Add all subscriptions of `other` set to the receiver.
    ///
    /// Subscriptions which duplicate already present entities are skipped.
    pub fn union(&self, other: &SubscriptionSet<T>) {
        if self.id.eq(&other.id) {
            return;
        }

        other
            .subscriptions
            .read()
            .iter()
            .for_each(|subscription| {
                let _ = self.add(subscription.clone());
            });
    }

    /// Remove all subscriptions of `other` set from the receiver.
    ///
    /// Entities which are not part of the receiver are skipped.
    pub fn subtract(&self, other: &SubscriptionSet<T>) {
        if self.id.eq(&other.id) {
            return;
        }

        other
            .subscriptions
            .read()
            .iter()
            .for_each(|subscription| {
                let _ = self.remove(subscription);
            });
    }

    /// Identifiers of entities which are part of the set.
    pub fn entity_ids(&self) -> Vec<String> {
        self.subscriptions
            .read()
            .iter()
            .map(|subscription| subscription.entity.id())
            .collect()
    }

    fn handler(&self) -> Arc<dyn EventHandler> {
        self.inner.clone()
    }
}

impl<T> Deref for SubscriptionSet<T> {
    type Target = SubscriptionSetRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for SubscriptionSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for SubscriptionSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl<T> Debug for SubscriptionSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "SubscriptionSet {{ id: {}, subscriptions: {:?}, is_subscribed: {}, options: {:?} }}",
            self.id,
            self.subscriptions.read(),
            self.is_subscribed(),
            self.options
        )
    }
}

impl<T> Add for SubscriptionSet<T>
where
    T: Transport + Send + Sync + 'static,
{
    type Output = SubscriptionSet<T>;

    fn add(self, rhs: Self) -> Self::Output {
        let subscriptions = {
            let mut subscriptions = self.subscriptions.read().clone();
            subscriptions.extend(rhs.subscriptions.read().iter().cloned());
            subscriptions
        };

        SubscriptionSet::new_with_subscriptions(subscriptions, self.options.clone())
    }
}

impl<T> Drop for SubscriptionSet<T> {
    fn drop(&mut self) {
        // The shared state outlives this handle when it is still referenced
        // by another clone.
        if Arc::strong_count(&self.inner) > 1 {
            return;
        }

        self.inner.invalidate_dropped();
    }
}

impl<T> SubscriptionSetRef<T> {
    /// Checks whether the [`SubscriptionSet`] is active or not.
    pub(super) fn is_subscribed(&self) -> bool {
        *self.is_subscribed.read()
    }

    /// Subscription input contributed by a single set member.
    ///
    /// Member input is computed with the set options, which override the
    /// member's own subscription options.
    fn member_input(&self, subscription: &Subscription<T>) -> SubscriptionInput {
        let with_presence = self.options.iter().flatten().any(|option| {
            matches!(option, SubscriptionOptions::ReceivePresenceEvents)
        });

        let is_channel_type = matches!(subscription.entity.r#type(), SubscribableType::Channel);
        let entity_names = subscription.entity.names(with_presence);

        SubscriptionInput::new(
            &is_channel_type.then(|| entity_names.clone()),
            &(!is_channel_type).then_some(entity_names),
        )
    }

    /// Aggregated subscription input of all set members.
    fn aggregated_input(&self) -> SubscriptionInput {
        self.subscriptions
            .read()
            .iter()
            .fold(SubscriptionInput::default(), |acc, subscription| {
                acc + self.member_input(subscription)
            })
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

    /// Events which are intended for this subscription set.
    fn filtered_events(&self, events: &[Update]) -> Vec<Update> {
        let subscription_input = self.aggregated_input();
        let current_timetoken = self.current_timetoken();

        events
            .iter()
            .filter(|event| {
                subscription_input.contains(&event.subscription())
                    && event.event_timestamp().ge(&current_timetoken)
            })
            .cloned()
            .collect()
    }

    /// Clean up after the last external handle has been dropped.
    fn invalidate_dropped(&self) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if !*is_subscribed {
                return;
            }
            *is_subscribed = false;
        }

        let input = self.aggregated_input();
        self.subscriptions
            .read()
            .iter()
            .for_each(|subscription| subscription.entity.decrease_subscriptions_count());
        self.event_dispatcher.invalidate();

        if let Some(manager) = self.client.existing_subscription_manager() {
            manager.unregister_with_input(&self.id, input);
        }
    }
}

impl<T> EventSubscriber for SubscriptionSet<T>
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

        info!("Subscribing set of {:?}", self.entity_ids());

        if let Some(cursor) = cursor.clone() {
            self.advance_cursor(cursor);
        }

        if let Some(manager) = self.client.subscription_manager(true) {
            // Mark entities as "in use" by the subscription set.
            self.subscriptions
                .read()
                .iter()
                .for_each(|subscription| subscription.entity.increase_subscriptions_count());
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

        info!("Unsubscribing set of {:?}", self.entity_ids());

        if let Some(manager) = self.client.subscription_manager(false) {
            // Mark entities as "not in use" by the subscription set.
            self.subscriptions
                .read()
                .iter()
                .for_each(|subscription| subscription.entity.decrease_subscriptions_count());
            manager.unregister(self.handler());
        }
    }
}

impl<T> EventHandler for SubscriptionSetRef<T>
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
        self.subscriptions
            .read()
            .iter()
            .filter(|subscription| {
                include_inactive || subscription.entity.subscriptions_count().gt(&0)
            })
            .fold(SubscriptionInput::default(), |acc, subscription| {
                acc + self.member_input(subscription)
            })
    }

    fn invalidate(&self) {
        {
            let mut is_subscribed = self.is_subscribed.write();
            if !*is_subscribed {
                return;
            }
            *is_subscribed = false;
        }

        self.subscriptions
            .read()
            .iter()
            .for_each(|subscription| subscription.entity.decrease_subscriptions_count());
        self.event_dispatcher.invalidate();
    }

    fn id(&self) -> &String {
        &self.id
    }
}

impl<T> EventEmitter for SubscriptionSet<T> {
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
