//! Managed effects cancellation module.
//!
//! This module provides [`CancellationTask`] which a managed effect races
//! against its transport call to support abortion of in-flight requests.

use async_channel::Receiver;

#[derive(Debug)]
pub(crate) struct CancellationTask {
    cancel_rx: Receiver<String>,
    id: String,
}

impl CancellationTask {
    pub fn new(cancel_rx: Receiver<String>, id: String) -> Self {
        Self { cancel_rx, id }
    }

    /// Resolves when cancellation of the effect with matching identifier has
    /// been requested.
    ///
    /// A closed cancellation pipe means the whole subscription loop is going
    /// away, which is treated as a cancellation as well.
    pub async fn wait_for_cancel(&self) {
        loop {
            match self.cancel_rx.recv().await {
                Ok(effect_id) if effect_id.eq(&self.id) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod should {
    use super::*;

    #[tokio::test]
    async fn wait_for_cancel() {
        let (cancel_tx, cancel_rx) = async_channel::bounded(2);
        let cancel_task = CancellationTask::new(cancel_rx, "id".into());

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            cancel_tx.send("other-id".into()).await.unwrap();
            cancel_tx.send("id".into()).await.unwrap();
        });

        cancel_task.wait_for_cancel().await;
    }

    #[tokio::test]
    async fn resolve_when_pipe_closed() {
        let (cancel_tx, cancel_rx) = async_channel::bounded::<String>(2);
        let cancel_task = CancellationTask::new(cancel_rx, "id".into());

        drop(cancel_tx);

        cancel_task.wait_for_cancel().await;
    }
}
