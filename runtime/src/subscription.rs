//! Subscription handles
//!
//! A [`Subscription`] owns the task that forwards a state stream into a
//! store. Dropping the handle aborts that task. [`Subscription::unsubscribe`]
//! also waits until the task has stopped, so once it returns no further
//! action from the subscription can reach the store.

use tokio::task::JoinHandle;

/// Handle to a live subscription
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap the forwarding task of a subscription
    #[must_use]
    pub const fn new(name: &'static str, task: JoinHandle<()>) -> Self {
        Self {
            name,
            task: Some(task),
        }
    }

    /// The subscription's name, for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the forwarding task is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop forwarding and wait for the forwarding task to finish
    ///
    /// The task may be in the middle of delivering an action on another
    /// worker thread; that delivery completes before this returns.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Ok(()) => {},
                Err(error) if error.is_cancelled() => {},
                Err(error) => {
                    tracing::error!(subscription = self.name, %error, "Forwarding task failed");
                },
            }
            tracing::debug!(subscription = self.name, "Unsubscribed");
        }
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(subscription = self.name, "Unsubscribed on drop");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
