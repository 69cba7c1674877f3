//! # Runtime implementation using Tokio
//!
//! This module contains the [`RuntimeTokio`] type.
//!
//! It requires the [`tokio` feature] to be enabled.
//!
//! [`tokio` feature]: ../index.html#features

use crate::core::Runtime;

use std::future::Future;

/// Tokio-based `async` runtime.
#[derive(Clone, Debug)]
pub struct RuntimeTokio;

#[async_trait::async_trait]
impl Runtime for RuntimeTokio {
    fn spawn<R>(&self, future: impl Future<Output = R> + Send + 'static)
    where
        R: Send + 'static,
    {
        tokio::spawn(future);
    }

    async fn sleep(self, delay: u64) {
        tokio::time::sleep(tokio::time::Duration::from_secs(delay)).await
    }
}
