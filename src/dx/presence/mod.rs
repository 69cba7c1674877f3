//! # Presence module.
//!
//! The presence module announces the client on channels and channel groups
//! which are part of the subscription loop. It owns the periodic heartbeat
//! schedule (one watcher task per client) and the executors used for
//! presence-related service calls.

use async_channel::{Receiver, Sender};
use futures::{
    future::{select, BoxFuture, Either},
    FutureExt,
};
use log::{debug, error};
use spin::RwLock;

use crate::{
    core::{FanlineError, Runtime},
    subscribe::event_engine::SubscriptionInput,
};

use std::sync::Arc;

/// Executor of presence heartbeat calls.
///
/// Takes lists of channels and channel groups for which presence should be
/// announced.
pub(crate) type HeartbeatEffectExecutor =
    dyn Fn(Vec<String>, Vec<String>) -> BoxFuture<'static, Result<(), FanlineError>> + Send + Sync;

/// Executor of presence leave calls.
///
/// Takes lists of channels and channel groups which the client leaves.
pub(crate) type LeaveEffectExecutor =
    dyn Fn(Vec<String>, Vec<String>) -> BoxFuture<'static, ()> + Send + Sync;

/// Presence manager.
///
/// One manager exists per client. When a heartbeat interval is configured,
/// the manager runs a watcher task which periodically announces presence for
/// the current subscription input.
pub(crate) struct PresenceManager {
    /// Heartbeat call function pointer.
    heartbeat_call: Arc<HeartbeatEffectExecutor>,

    /// Channels and groups for which presence should be announced.
    input: RwLock<SubscriptionInput>,

    /// Heartbeat watcher shutdown channel.
    shutdown_channel: Sender<()>,
}

impl PresenceManager {
    /// Create a presence manager.
    ///
    /// The heartbeat watcher task is spawned only when `heartbeat_interval`
    /// is configured.
    pub fn new<R>(
        heartbeat_call: Arc<HeartbeatEffectExecutor>,
        heartbeat_interval: Option<u64>,
        runtime: R,
    ) -> Arc<Self>
    where
        R: Runtime + 'static,
    {
        let (shutdown_tx, shutdown_rx) = async_channel::bounded::<()>(1);

        let manager = Arc::new(Self {
            heartbeat_call,
            input: Default::default(),
            shutdown_channel: shutdown_tx,
        });

        if let Some(interval) = heartbeat_interval {
            manager.start_watcher(interval, shutdown_rx, runtime);
        }

        manager
    }

    /// Replace the set of channels and groups for which presence is
    /// announced.
    pub fn update_input(&self, input: SubscriptionInput) {
        *self.input.write() = input;
    }

    /// Announce presence for the currently tracked input right away.
    pub async fn announce(&self) {
        let (channels, channel_groups) = {
            let input = self.input.read();
            (
                input.channels().unwrap_or_default(),
                input.channel_groups().unwrap_or_default(),
            )
        };

        if channels.is_empty() && channel_groups.is_empty() {
            return;
        }

        if let Err(err) = (self.heartbeat_call)(channels, channel_groups).await {
            error!("Presence heartbeat failed: {err}");
        }
    }

    /// Stop the heartbeat watcher task.
    pub fn stop(&self) {
        let _ = self.shutdown_channel.try_send(());
    }

    fn start_watcher<R>(self: &Arc<Self>, interval: u64, shutdown_rx: Receiver<()>, runtime: R)
    where
        R: Runtime + 'static,
    {
        let manager = self.clone();
        let tick_runtime = runtime.clone();

        runtime.spawn(async move {
            debug!("Starting presence heartbeat watcher ({interval}s)");

            loop {
                let sleep = tick_runtime.clone().sleep(interval).boxed();
                let shutdown = shutdown_rx.recv().boxed();

                match select(sleep, shutdown).await {
                    Either::Left(_) => manager.announce().await,
                    Either::Right(_) => break,
                }
            }

            debug!("Presence heartbeat watcher stopped");
        });
    }
}

impl Drop for PresenceManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for PresenceManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PresenceManager {{ input: {:?} }}", self.input.read())
    }
}

#[cfg(test)]
mod should {
    use super::*;
    use crate::providers::futures_tokio::RuntimeTokio;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn input(channels: &[&str]) -> SubscriptionInput {
        SubscriptionInput::new(
            &Some(channels.iter().map(|c| c.to_string()).collect()),
            &None,
        )
    }

    #[tokio::test]
    async fn announce_presence_for_tracked_input() {
        let announced = Arc::new(AtomicUsize::new(0));
        let announced_clone = announced.clone();
        let heartbeat: Arc<HeartbeatEffectExecutor> = Arc::new(move |channels, _| {
            assert_eq!(channels, vec!["ch1".to_string()]);
            let announced = announced_clone.clone();
            async move {
                announced.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            .boxed()
        });

        let manager = PresenceManager::new(heartbeat, None, RuntimeTokio);
        manager.update_input(input(&["ch1"]));

        manager.announce().await;

        assert_eq!(announced.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn not_announce_presence_for_empty_input() {
        let heartbeat: Arc<HeartbeatEffectExecutor> = Arc::new(|_, _| {
            panic!("Heartbeat shouldn't be called for empty input");
        });

        let manager = PresenceManager::new(heartbeat, None, RuntimeTokio);

        manager.announce().await;
    }

    #[tokio::test]
    async fn tick_heartbeat_watcher() {
        let announced = Arc::new(AtomicUsize::new(0));
        let announced_clone = announced.clone();
        let heartbeat: Arc<HeartbeatEffectExecutor> = Arc::new(move |_, _| {
            let announced = announced_clone.clone();
            async move {
                announced.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            .boxed()
        });

        // Zero interval keeps the test fast; real configurations use tens of
        // seconds.
        let manager = PresenceManager::new(heartbeat, Some(0), RuntimeTokio);
        manager.update_input(input(&["ch1"]));

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        manager.stop();

        assert!(announced.load(Ordering::Relaxed) > 0);
    }
}
