//! Fire-and-forget event channels
//!
//! Every hook gets its own bounded channel. Producers are cheap to clone and are handed to the APIs, which publish
//! after their transactions commit. The handler end receives events and runs the hook for each one on its own task,
//! so a slow hook never holds up the storefront. Hooks only see the event payload, never the engine's state.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub type Handler<E> = Arc<dyn Fn(E) -> HookFuture + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    hook: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, hook: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, hook }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight hooks to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Only producers may keep the channel open
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.receiver.recv().await {
            let hook = Arc::clone(&self.hook);
            jobs.spawn(async move { (hook)(ev).await });
            // Reap finished hooks as we go so the set stays small
            while let Some(done) = jobs.try_join_next() {
                log_outcome(done);
            }
        }
        debug!("📬️ All producers gone. Waiting for {} hook(s) to finish", jobs.len());
        while let Some(done) = jobs.join_next().await {
            log_outcome(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_outcome(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook did not complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            error!("📬️ Event dropped. The handler for this hook is no longer running");
        }
    }
}
