//! Subscriptions' manager.
//!
//! This module contains the manager which is responsible for tracking
//! registered subscriptions, driving the subscribe event engine and
//! coordinating presence leave announcements for abandoned subscribables.

use log::debug;
use spin::{Mutex, RwLock};

use crate::{
    core::{Runtime, RuntimeSupport},
    dx::presence::{LeaveEffectExecutor, PresenceManager},
    subscribe::{
        event_engine::{
            SubscribeEvent, SubscribeEventEngine, SubscriptionInput,
            SubscribeEffectInvocation::TerminateEventEngine,
        },
        traits::EventHandler,
        ConnectionStatus, EventDispatcher, SubscriptionCursor, Update,
    },
};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

/// In-flight transaction tracker with pending leave accumulators.
///
/// A leave announcement can't be sent while a subscribe call is in flight;
/// abandoned subscribables accumulate here and are drained when the
/// transaction completes or is cancelled.
pub(crate) struct LeaveTracker {
    /// Whether a subscribe transaction is currently in flight.
    in_flight: AtomicBool,

    /// Channels for which leave has been requested while busy.
    leave_channels: Mutex<Vec<String>>,

    /// Channel groups for which leave has been requested while busy.
    leave_channel_groups: Mutex<Vec<String>>,
}

impl LeaveTracker {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            leave_channels: Mutex::new(Vec::new()),
            leave_channel_groups: Mutex::new(Vec::new()),
        }
    }

    /// Whether no transaction is currently in flight.
    pub fn is_idle(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    /// Mark the beginning of a subscribe transaction.
    pub fn begin_transaction(&self) {
        self.in_flight.store(true, Ordering::Release);
    }

    /// Mark the end of a subscribe transaction.
    ///
    /// Returns leave targets accumulated while the transaction was in
    /// flight, if there are any.
    pub fn end_transaction(&self) -> Option<(Vec<String>, Vec<String>)> {
        self.in_flight.store(false, Ordering::Release);
        self.drain()
    }

    /// Accumulate leave targets until the current transaction completes.
    pub fn enqueue(&self, channels: Vec<String>, channel_groups: Vec<String>) {
        self.leave_channels.lock().extend(channels);
        self.leave_channel_groups.lock().extend(channel_groups);
    }

    fn drain(&self) -> Option<(Vec<String>, Vec<String>)> {
        let channels = core::mem::take(&mut *self.leave_channels.lock());
        let channel_groups = core::mem::take(&mut *self.leave_channel_groups.lock());

        (!channels.is_empty() || !channel_groups.is_empty()).then_some((channels, channel_groups))
    }
}

/// Active subscriptions manager.
///
/// The client allows to have multiple [`Subscription`] and
/// [`SubscriptionSet`] objects; the manager aggregates their subscription
/// inputs, feeds changes into the subscribe event engine and routes received
/// statuses and real-time updates back to them.
///
/// [`Subscription`]: crate::subscribe::Subscription
/// [`SubscriptionSet`]: crate::subscribe::SubscriptionSet
pub(crate) struct SubscriptionManager {
    /// Subscription event engine.
    ///
    /// State machine which is responsible for subscription loop maintenance.
    subscribe_event_engine: Arc<SubscribeEventEngine>,

    /// List of registered event handlers.
    ///
    /// Handlers which will receive real-time updates and whose subscription
    /// inputs build up the aggregated subscribables list.
    event_handlers: RwLock<Vec<Weak<dyn EventHandler>>>,

    /// Global real-time events dispatcher.
    ///
    /// Client-level listener streams (including connection statuses) are
    /// attached here.
    event_dispatcher: Arc<EventDispatcher>,

    /// Presence manager.
    ///
    /// Keeps the presence heartbeat watcher informed about the current
    /// subscription input.
    presence_manager: Arc<PresenceManager>,

    /// In-flight transaction tracker with pending leave accumulators.
    leave_tracker: Arc<LeaveTracker>,

    /// Leave call function pointer.
    leave_call: Arc<LeaveEffectExecutor>,

    /// Runtime used to spawn leave announcements.
    runtime: RuntimeSupport,
}

impl SubscriptionManager {
    pub fn new(
        subscribe_event_engine: Arc<SubscribeEventEngine>,
        presence_manager: Arc<PresenceManager>,
        leave_tracker: Arc<LeaveTracker>,
        leave_call: Arc<LeaveEffectExecutor>,
        runtime: RuntimeSupport,
    ) -> Self {
        Self {
            subscribe_event_engine,
            event_handlers: Default::default(),
            event_dispatcher: Arc::new(EventDispatcher::new()),
            presence_manager,
            leave_tracker,
            leave_call,
            runtime,
        }
    }

    /// Global real-time events dispatcher.
    pub fn event_dispatcher(&self) -> Arc<EventDispatcher> {
        self.event_dispatcher.clone()
    }

    /// Register an event handler in the subscription loop.
    ///
    /// A `cursor` with a non-initial timetoken makes the subscription loop
    /// catch up on updates starting from the pointed moment.
    pub fn register(&self, handler: Arc<dyn EventHandler>, cursor: Option<SubscriptionCursor>) {
        {
            let mut handlers = self.event_handlers.write();
            handlers.push(Arc::downgrade(&handler));
        }

        let input = self.current_input();
        self.presence_manager.update_input(input.clone());

        let event = match cursor {
            Some(cursor) if !cursor.is_initial() => SubscribeEvent::SubscriptionRestored {
                channels: input.channels(),
                channel_groups: input.channel_groups(),
                cursor,
                sent_by_ee: false,
            },
            _ => SubscribeEvent::SubscriptionChanged {
                channels: input.channels(),
                channel_groups: input.channel_groups(),
                sent_by_ee: false,
            },
        };

        self.subscribe_event_engine.process(&event);
    }

    /// Remove an event handler from the subscription loop.
    pub fn unregister(&self, handler: Arc<dyn EventHandler>) {
        self.unregister_with_input(handler.id(), handler.subscription_input(true));
    }

    /// Remove an event handler (by identifier) from the subscription loop.
    ///
    /// Subscribables which were contributed only by the removed handler are
    /// announced as left.
    pub fn unregister_with_input(&self, handler_id: &str, input: SubscriptionInput) {
        {
            let mut handlers = self.event_handlers.write();
            handlers.retain(|weak| {
                weak.upgrade()
                    .map_or(false, |handler| handler.id().ne(handler_id))
            });
        }

        let remaining = self.current_input();
        self.presence_manager.update_input(remaining.clone());

        let abandoned = input - remaining.clone();
        if !abandoned.is_empty() {
            self.send_leave(&abandoned);
        }

        self.subscribe_event_engine
            .process(&SubscribeEvent::SubscriptionChanged {
                channels: remaining.channels(),
                channel_groups: remaining.channel_groups(),
                sent_by_ee: true,
            });
    }

    /// Handle membership change of a registered subscription set.
    ///
    /// `removed` carries the input of a member which has been removed from
    /// the set, so subscribables which are not covered by anything else can
    /// be announced as left.
    pub fn membership_changed(&self, removed: Option<SubscriptionInput>) {
        let input = self.current_input();
        self.presence_manager.update_input(input.clone());

        if let Some(removed) = removed {
            let abandoned = removed - input.clone();
            if !abandoned.is_empty() {
                self.send_leave(&abandoned);
            }
        }

        self.subscribe_event_engine
            .process(&SubscribeEvent::SubscriptionChanged {
                channels: input.channels(),
                channel_groups: input.channel_groups(),
                sent_by_ee: false,
            });
    }

    /// Temporarily stop real-time updates receive.
    pub fn disconnect(&self) {
        self.subscribe_event_engine.process(&SubscribeEvent::Disconnect);
    }

    /// Restore real-time updates receive.
    pub fn reconnect(&self, cursor: Option<SubscriptionCursor>) {
        self.subscribe_event_engine
            .process(&SubscribeEvent::Reconnect { cursor });
    }

    /// Unsubscribe from everything.
    ///
    /// Invalidates all registered handlers, announces leave for everything
    /// which was part of the subscription loop and moves the state machine
    /// into the unsubscribed state.
    pub fn unsubscribe_all(&self) {
        let input = self.current_input();

        {
            let mut handlers = self.event_handlers.write();
            handlers.iter().for_each(|weak| {
                if let Some(handler) = weak.upgrade() {
                    handler.invalidate();
                }
            });
            handlers.clear();
        }

        self.presence_manager.update_input(Default::default());

        if !input.is_empty() {
            self.send_leave(&input);
        }

        self.subscribe_event_engine
            .process(&SubscribeEvent::UnsubscribeAll);
    }

    /// Notify about connection status change.
    pub fn notify_new_status(&self, status: ConnectionStatus) {
        self.event_dispatcher.handle_status(status);
    }

    /// Notify about received real-time updates.
    pub fn notify_new_messages(&self, cursor: SubscriptionCursor, messages: Vec<Update>) {
        {
            let handlers = self.event_handlers.read();
            handlers.iter().for_each(|weak| {
                if let Some(handler) = weak.upgrade() {
                    handler.handle_events(cursor.clone(), &messages);
                }
            });
        }

        self.event_dispatcher.handle_events(messages);
    }

    /// Terminate the subscription module.
    ///
    /// Used during client destruction.
    pub fn terminate(&self) {
        {
            let mut handlers = self.event_handlers.write();
            handlers.iter().for_each(|weak| {
                if let Some(handler) = weak.upgrade() {
                    handler.invalidate();
                }
            });
            handlers.clear();
        }

        self.presence_manager.stop();
        self.subscribe_event_engine.stop(TerminateEventEngine);
    }

    /// Aggregated subscription input of all registered handlers.
    ///
    /// The aggregate is recomputed from scratch on every call; dead handler
    /// references are pruned along the way.
    fn current_input(&self) -> SubscriptionInput {
        let mut handlers = self.event_handlers.write();
        handlers.retain(|weak| weak.upgrade().is_some());

        handlers
            .iter()
            .filter_map(|weak| weak.upgrade())
            .fold(SubscriptionInput::default(), |acc, handler| {
                acc + handler.subscription_input(false)
            })
    }

    /// Announce leave for abandoned subscribables.
    ///
    /// The announcement is queued when a subscribe transaction is in flight
    /// and sent when it completes.
    fn send_leave(&self, input: &SubscriptionInput) {
        let channels = input.channels().unwrap_or_default();
        let channel_groups = input.channel_groups().unwrap_or_default();

        if self.leave_tracker.is_idle() {
            debug!("Announcing leave for {channels:?} / {channel_groups:?}");
            self.runtime
                .spawn((self.leave_call)(channels, channel_groups));
        } else {
            debug!("Queueing leave for {channels:?} / {channel_groups:?}");
            self.leave_tracker.enqueue(channels, channel_groups);
        }
    }
}

impl core::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SubscriptionManager {{ handlers: {} }}",
            self.event_handlers.read().len()
        )
    }
}
