//! # Data stream module
//!
//! This module contains the [`DataStream`] struct used to deliver real-time
//! events to listeners attached to the client, subscriptions and
//! subscription sets.

use futures::Stream;
use spin::RwLock;

use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

/// A generic listener stream.
///
/// [`DataStream`] is a poll-based queue: event producers push data into the
/// queue and the stream listener is woken up to consume it. Clones share the
/// same queue, so a stream handle can be passed around freely.
#[derive(Debug, Default)]
pub struct DataStream<D> {
    inner: Arc<DataStreamRef<D>>,
}

#[derive(Debug, Default)]
struct DataStreamRef<D> {
    /// Queue with data for the stream listener.
    queue: RwLock<VecDeque<D>>,

    /// Waker used each time when new data is available for the listener.
    waker: RwLock<Option<Waker>>,

    /// Whether the data stream is still valid or not.
    ///
    /// Invalidated streams complete and don't accept new data.
    is_valid: RwLock<bool>,
}

impl<D> DataStream<D> {
    /// Creates a new [`DataStream`] with a default queue size of 100.
    pub fn new() -> DataStream<D> {
        Self::with_queue_size(100)
    }

    /// Creates a new [`DataStream`] bounded by `size` queued entries.
    ///
    /// When the queue is full the earliest entry is dropped to make room for
    /// a new one.
    pub fn with_queue_size(size: usize) -> DataStream<D> {
        Self::with_queue_data(VecDeque::new(), size)
    }

    /// Creates a new [`DataStream`] pre-filled with `data`.
    ///
    /// Used to hand events which arrived before the listener has been
    /// attached over to a freshly created stream.
    pub fn with_queue_data(data: VecDeque<D>, size: usize) -> DataStream<D> {
        let mut queue = VecDeque::with_capacity(size);
        let capacity = queue.capacity();
        queue.extend(data.into_iter().take(capacity));

        Self {
            inner: Arc::new(DataStreamRef {
                queue: RwLock::new(queue),
                waker: RwLock::new(None),
                is_valid: RwLock::new(true),
            }),
        }
    }

    pub(crate) fn push_data(&self, data: D) {
        if !*self.inner.is_valid.read() {
            return;
        }

        {
            let mut queue = self.inner.queue.write();
            if queue.len() == queue.capacity() {
                queue.pop_front();
            }
            queue.push_back(data);
        }

        self.wake_stream();
    }

    /// Terminate the stream.
    ///
    /// The listener observes the end of the stream on the next poll.
    pub(crate) fn invalidate(&self) {
        *self.inner.is_valid.write() = false;
        self.wake_stream();
    }

    fn wake_stream(&self) {
        if let Some(waker) = self.inner.waker.write().take() {
            waker.wake();
        }
    }
}

impl<D> Clone for DataStream<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> Stream for DataStream<D> {
    type Item = D;

    fn poll_next(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !*self.inner.is_valid.read() {
            return Poll::Ready(None);
        }

        let mut waker_slot = self.inner.waker.write();
        *waker_slot = Some(ctx.waker().clone());

        if let Some(data) = self.inner.queue.write().pop_front() {
            Poll::Ready(Some(data))
        } else {
            Poll::Pending
        }
    }
}
