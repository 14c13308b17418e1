//! AlertActor - turns readings into push notifications
//!
//! The actor exclusively owns the device registry, so readings and registry
//! commands are processed strictly one at a time:
//!
//! ```text
//! ReadingEvent ──► decide + record (per device, per metric) ──► batch
//!                                                               │
//!                                          tokio::spawn(deliver(batch))
//! ```
//!
//! Deciding and recording happen in the same step. Delivery runs in its own
//! task and never blocks the next reading.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

use super::messages::{AlertCommand, ReadingEvent};
use crate::notifications::{
    AlertDispatcher, DeviceRegistry, PushService, RegisteredDevice, TokenValidator, deliver,
};

/// Validates tokens with the rules of the configured push service
struct PushTokenFormat(Arc<dyn PushService>);

impl TokenValidator for PushTokenFormat {
    fn is_valid_token(&self, token: &str) -> bool {
        self.0.is_valid_token(token)
    }
}

pub struct AlertActor {
    registry: DeviceRegistry,
    dispatcher: AlertDispatcher,
    push: Arc<dyn PushService>,

    /// Command receiver
    command_rx: mpsc::Receiver<AlertCommand>,

    /// Reading event receiver (broadcast subscription)
    reading_rx: broadcast::Receiver<ReadingEvent>,
}

impl AlertActor {
    pub fn new(
        dispatcher: AlertDispatcher,
        push: Arc<dyn PushService>,
        command_rx: mpsc::Receiver<AlertCommand>,
        reading_rx: broadcast::Receiver<ReadingEvent>,
    ) -> Self {
        let registry = DeviceRegistry::new(Arc::new(PushTokenFormat(Arc::clone(&push))));

        Self {
            registry,
            dispatcher,
            push,
            command_rx,
            reading_rx,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                result = self.reading_rx.recv() => {
                    match result {
                        Ok(event) => self.handle_reading(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("alert actor lagged, skipped {skipped} readings");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("reading channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("alert actor stopped");
    }

    #[instrument(skip_all, fields(timestamp = %event.reading.timestamp))]
    fn handle_reading(&mut self, event: ReadingEvent) {
        let batch = self.dispatcher.on_reading(&mut self.registry, &event.reading);
        if batch.is_empty() {
            trace!("nothing to notify");
            return;
        }

        debug!("dispatching {} notification(s)", batch.len());
        let push = Arc::clone(&self.push);
        tokio::spawn(async move {
            deliver(push.as_ref(), batch).await;
        });
    }

    /// Returns `false` when the actor should stop
    fn handle_command(&mut self, cmd: AlertCommand) -> bool {
        match cmd {
            AlertCommand::Register { token, respond_to } => {
                let _ = respond_to.send(self.registry.register(&token));
            }

            AlertCommand::Unregister { token, respond_to } => {
                let _ = respond_to.send(self.registry.unregister(&token));
            }

            AlertCommand::ListDevices { respond_to } => {
                let _ = respond_to.send(self.registry.list());
            }

            AlertCommand::GetDevice { token, respond_to } => {
                let _ = respond_to.send(self.registry.get(&token).cloned());
            }

            AlertCommand::ResetAll { respond_to } => {
                self.registry.reset_all();
                let _ = respond_to.send(());
            }

            AlertCommand::Shutdown => {
                debug!("received shutdown command");
                return false;
            }
        }

        true
    }
}

/// Handle for controlling the AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    pub fn spawn(
        dispatcher: AlertDispatcher,
        push: Arc<dyn PushService>,
        reading_rx: broadcast::Receiver<ReadingEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = AlertActor::new(dispatcher, push, cmd_rx, reading_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> AlertCommand,
    ) -> anyhow::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .context("alert actor is not running")?;
        rx.await.context("alert actor dropped the request")
    }

    /// Returns `false` if the token is malformed
    pub async fn register(&self, token: impl Into<String>) -> anyhow::Result<bool> {
        let token = token.into();
        self.request(|respond_to| AlertCommand::Register { token, respond_to })
            .await
    }

    /// Returns `false` if the token was not registered
    pub async fn unregister(&self, token: impl Into<String>) -> anyhow::Result<bool> {
        let token = token.into();
        self.request(|respond_to| AlertCommand::Unregister { token, respond_to })
            .await
    }

    pub async fn list_devices(&self) -> anyhow::Result<Vec<String>> {
        self.request(|respond_to| AlertCommand::ListDevices { respond_to })
            .await
    }

    pub async fn get_device(
        &self,
        token: impl Into<String>,
    ) -> anyhow::Result<Option<RegisteredDevice>> {
        let token = token.into();
        self.request(|respond_to| AlertCommand::GetDevice { token, respond_to })
            .await
    }

    pub async fn reset_all(&self) -> anyhow::Result<()> {
        self.request(|respond_to| AlertCommand::ResetAll { respond_to })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
    }
}
