//! # Event dispatcher module
//!
//! This module contains the [`EventDispatcher`] type, which is used by the
//! client, [`Subscription`] and [`SubscriptionSet`] to let users attach
//! listener streams to specific real-time event types.
//!
//! [`Subscription`]: crate::subscribe::Subscription
//! [`SubscriptionSet`]: crate::subscribe::SubscriptionSet

use spin::{RwLock, RwLockWriteGuard};

use crate::{
    core::DataStream,
    subscribe::{ConnectionStatus, EventEmitter, Message, SubscribeStreamEvent, Update},
};

use std::collections::VecDeque;

/// Real-time events dispatcher.
///
/// Dispatcher responsible for handling status changes and real-time updates
/// and pushing them to the specific data streams that listen to them.
/// Internal event queues cover the period when events have been received
/// before any listener has been attached; as soon as there is at least one
/// listener, the queue is drained into it.
#[derive(Debug)]
pub(crate) struct EventDispatcher {
    /// Whether any listener stream has been created or not.
    has_streams: RwLock<bool>,

    /// Data streams for message events.
    pub(crate) message_streams: RwLock<Option<Vec<DataStream<Message>>>>,

    /// Data streams for signal events.
    signal_streams: RwLock<Option<Vec<DataStream<Message>>>>,

    /// Data streams for message action events.
    message_action_streams: RwLock<Option<Vec<DataStream<Message>>>>,

    /// Data streams for application context (channel and user metadata)
    /// events.
    object_streams: RwLock<Option<Vec<DataStream<Message>>>>,

    /// Data streams for file sharing events.
    file_streams: RwLock<Option<Vec<DataStream<Message>>>>,

    /// Data streams for connection status change events.
    status_streams: RwLock<Option<Vec<DataStream<ConnectionStatus>>>>,

    /// Data streams which receive every update.
    streams: RwLock<Option<Vec<DataStream<Update>>>>,

    /// List of events to be delivered to late-attached listener streams.
    updates: RwLock<VecDeque<SubscribeStreamEvent>>,
}

impl EventDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            has_streams: Default::default(),
            message_streams: Default::default(),
            signal_streams: Default::default(),
            message_action_streams: Default::default(),
            object_streams: Default::default(),
            file_streams: Default::default(),
            status_streams: Default::default(),
            streams: Default::default(),
            updates: RwLock::new(VecDeque::with_capacity(100)),
        }
    }

    /// Stream with connection status change events.
    pub(crate) fn status_stream(&self) -> DataStream<ConnectionStatus> {
        let statuses = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Status(status) => Some(status.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.status_streams.write(), statuses)
    }

    /// Dispatch received connection status change.
    pub(crate) fn handle_status(&self, status: ConnectionStatus) {
        if !*self.has_streams.read() {
            self.updates
                .write()
                .push_back(SubscribeStreamEvent::Status(status));
            return;
        }

        Self::push_event_to_streams(&status, &self.status_streams);
    }

    /// Dispatch received real-time updates.
    ///
    /// Each update is delivered to the stream list dedicated to its type and
    /// to the generic updates streams.
    pub(crate) fn handle_events(&self, events: Vec<Update>) {
        if !*self.has_streams.read() {
            let mut updates_slot = self.updates.write();
            updates_slot.extend(events.into_iter().map(SubscribeStreamEvent::Update));
            return;
        }

        for event in events {
            match &event {
                Update::Message(message) => {
                    Self::push_event_to_streams(message, &self.message_streams)
                }
                Update::Signal(signal) => Self::push_event_to_streams(signal, &self.signal_streams),
                Update::MessageAction(action) => {
                    Self::push_event_to_streams(action, &self.message_action_streams)
                }
                Update::Object(object) => Self::push_event_to_streams(object, &self.object_streams),
                Update::File(file) => Self::push_event_to_streams(file, &self.file_streams),
            }

            Self::push_event_to_streams(&event, &self.streams);
        }
    }

    /// Create a new [`DataStream`] and add it to the given list of streams.
    fn create_stream_in_list<S>(
        &self,
        mut streams: RwLockWriteGuard<Option<Vec<DataStream<S>>>>,
        data: Option<VecDeque<S>>,
    ) -> DataStream<S> {
        *self.has_streams.write() = true;

        let stream = if let Some(data) = data {
            DataStream::with_queue_data(data, 100)
        } else {
            DataStream::new()
        };

        if let Some(streams) = streams.as_mut() {
            streams.push(stream.clone());
        } else {
            *streams = Some(vec![stream.clone()]);
        }

        stream
    }

    /// Push an event to each stream in the provided list.
    fn push_event_to_streams<S>(event: &S, streams: &RwLock<Option<Vec<DataStream<S>>>>)
    where
        S: Clone,
    {
        let Some(streams) = &*streams.read() else {
            return;
        };

        streams
            .iter()
            .for_each(|stream| stream.push_data(event.clone()));
    }

    /// Dequeue events which match `condition_map` from the pre-listener
    /// queue.
    ///
    /// Used to hand events which arrived before the first listener over to a
    /// freshly created stream.
    fn dequeue_matching_events<C, E>(&self, condition_map: C) -> Option<VecDeque<E>>
    where
        C: Fn(&SubscribeStreamEvent) -> Option<E>,
    {
        let mut updates = self.updates.write();
        let mut filtered = VecDeque::with_capacity(100);
        let mut idx: usize = 0;

        while idx != updates.len() {
            if condition_map(&updates[idx]).is_some() {
                if let Some(update) = updates.remove(idx).as_ref().and_then(&condition_map) {
                    filtered.push_back(update);
                }
            } else {
                idx += 1;
            }
        }

        (!filtered.is_empty()).then_some(filtered)
    }

    /// Invalidate all streams created by the dispatcher.
    pub(crate) fn invalidate(&self) {
        let mut has_streams_slot = self.has_streams.write();
        if !*has_streams_slot {
            return;
        }
        *has_streams_slot = false;

        Self::invalidate_streams(&self.message_streams);
        Self::invalidate_streams(&self.signal_streams);
        Self::invalidate_streams(&self.message_action_streams);
        Self::invalidate_streams(&self.object_streams);
        Self::invalidate_streams(&self.file_streams);
        Self::invalidate_streams(&self.status_streams);
        Self::invalidate_streams(&self.streams);
    }

    fn invalidate_streams<S>(streams: &RwLock<Option<Vec<DataStream<S>>>>) {
        if let Some(streams) = streams.write().as_mut() {
            streams.iter().for_each(|stream| stream.invalidate());
            streams.clear();
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.invalidate()
    }
}

impl EventEmitter for EventDispatcher {
    fn messages_stream(&self) -> DataStream<Message> {
        let messages = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(Update::Message(message)) => Some(message.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.message_streams.write(), messages)
    }

    fn signals_stream(&self) -> DataStream<Message> {
        let signals = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(Update::Signal(signal)) => Some(signal.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.signal_streams.write(), signals)
    }

    fn message_actions_stream(&self) -> DataStream<Message> {
        let actions = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(Update::MessageAction(action)) => Some(action.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.message_action_streams.write(), actions)
    }

    fn objects_stream(&self) -> DataStream<Message> {
        let objects = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(Update::Object(object)) => Some(object.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.object_streams.write(), objects)
    }

    fn files_stream(&self) -> DataStream<Message> {
        let files = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(Update::File(file)) => Some(file.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.file_streams.write(), files)
    }

    fn stream(&self) -> DataStream<Update> {
        let updates = self.dequeue_matching_events(|event| match event {
            SubscribeStreamEvent::Update(update) => Some(update.clone()),
            _ => None,
        });

        self.create_stream_in_list(self.streams.write(), updates)
    }
}

#[cfg(test)]
mod it_should {
    use futures::StreamExt;
    use tokio::time::{timeout, Duration};

    use super::*;

    fn message(channel: &str, data: &str) -> Message {
        Message {
            sender: Some("test-user".into()),
            timestamp: 0,
            channel: channel.to_string(),
            subscription: channel.to_string(),
            data: data.to_string().into_bytes(),
            flags: 0,
        }
    }

    fn events() -> Vec<Update> {
        vec![
            Update::Message(message("test-channel", "Test message 1")),
            Update::Signal(message("test-channel", "Test signal 1")),
            Update::File(message("test-channel", "file-upload")),
            Update::Message(message("test-channel", "Test message 2")),
        ]
    }

    async fn collected_events_count<S>(stream: DataStream<S>) -> usize {
        let mut events_count = 0;
        let mut stream = stream.take(10);
        loop {
            match timeout(Duration::from_millis(100), stream.next()).await {
                Ok(Some(_)) => events_count += 1,
                _ => break,
            }
        }
        events_count
    }

    #[test]
    fn create_event_dispatcher() {
        let dispatcher = EventDispatcher::new();
        assert!(!*dispatcher.has_streams.read());
    }

    #[test]
    fn queue_events_when_there_are_no_listeners() {
        let dispatcher = EventDispatcher::new();
        let events = events();

        dispatcher.handle_status(ConnectionStatus::Connected);
        dispatcher.handle_events(events.clone());

        assert_eq!(dispatcher.updates.read().len(), events.len() + 1);
    }

    #[tokio::test]
    async fn dequeue_events_into_created_listener_streams() {
        let dispatcher = EventDispatcher::new();

        dispatcher.handle_status(ConnectionStatus::Connected);
        dispatcher.handle_events(events());

        assert_eq!(collected_events_count(dispatcher.messages_stream()).await, 2);
        assert_eq!(collected_events_count(dispatcher.signals_stream()).await, 1);
        assert_eq!(collected_events_count(dispatcher.files_stream()).await, 1);
        assert_eq!(collected_events_count(dispatcher.status_stream()).await, 1);

        // Queued events are handed over to the first listener only.
        assert_eq!(collected_events_count(dispatcher.messages_stream()).await, 0);
    }

    #[tokio::test]
    async fn deliver_events_to_attached_streams() {
        let dispatcher = EventDispatcher::new();
        let stream = dispatcher.stream();

        dispatcher.handle_events(events());

        assert_eq!(collected_events_count(stream).await, 4);
    }

    #[tokio::test]
    async fn invalidate_attached_streams() {
        let dispatcher = EventDispatcher::new();
        let stream = dispatcher.messages_stream();

        dispatcher.invalidate();

        assert_eq!(stream.clone().next().await, None);
        assert!(dispatcher.message_streams.read().as_ref().unwrap().is_empty());
    }
}
