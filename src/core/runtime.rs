//! This module contains the task spawning trait used in the Fanline client.
//!
//! The [`Runtime`] trait is used to spawn async tasks and to suspend the
//! current task in work of the Fanline client.

use futures::{future::BoxFuture, FutureExt};
use std::{future::Future, sync::Arc};

/// Fanline runtime trait.
///
/// This trait is used to spawn async tasks and suspend the current task in
/// work of the Fanline client. It is used to run the subscription loop and
/// the periodic presence heartbeat.
///
/// # Examples
/// ```
/// use fanline::core::Runtime;
/// use std::future::Future;
///
/// #[derive(Clone)]
/// struct MyRuntime;
///
/// #[async_trait::async_trait]
/// impl Runtime for MyRuntime {
///    fn spawn<R>(&self, future: impl Future<Output = R> + Send + 'static)
///    where
///        R: Send + 'static,
///    {
///       // spawn the Future
///       // e.g. tokio::spawn(future);
///    }
///
///    async fn sleep(self, delay: u64) {
///       // e.g. tokio::time::sleep(tokio::time::Duration::from_secs(delay)).await
///    }
/// }
/// ```
#[async_trait::async_trait]
pub trait Runtime: Clone + Send + Sync {
    /// Spawn a detached task.
    fn spawn<R>(&self, future: impl Future<Output = R> + Send + 'static)
    where
        R: Send + 'static;

    /// Suspend the current task for `delay` seconds.
    async fn sleep(self, delay: u64);
}

/// Type-erased runtime.
///
/// The client stores the user-provided runtime behind this erased form so
/// components created lazily (the subscription module) don't have to be
/// generic over the runtime type.
#[derive(Clone)]
pub(crate) struct RuntimeSupport {
    spawner: Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>,
    sleeper: Arc<dyn Fn(u64) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl RuntimeSupport {
    pub fn new<R>(runtime: R) -> Self
    where
        R: Runtime + 'static,
    {
        let sleep_runtime = runtime.clone();

        Self {
            spawner: Arc::new(move |future| runtime.spawn(future)),
            sleeper: Arc::new(move |delay| sleep_runtime.clone().sleep(delay).boxed()),
        }
    }
}

#[async_trait::async_trait]
impl Runtime for RuntimeSupport {
    fn spawn<R>(&self, future: impl Future<Output = R> + Send + 'static)
    where
        R: Send + 'static,
    {
        (self.spawner)(
            async move {
                future.await;
            }
            .boxed(),
        );
    }

    async fn sleep(self, delay: u64) {
        (self.sleeper)(delay).await
    }
}

impl core::fmt::Debug for RuntimeSupport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RuntimeSupport")
    }
}
