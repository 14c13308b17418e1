//! SensorFeedActor - drives the MQTT connection
//!
//! Every ConnAck (re)subscribes to the sensor topics, so a broker restart does
//! not silently stop the feed. Connection errors are recorded on the ingest
//! bridge and retried after the configured delay.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::SensorFeedCommand;
use crate::config::MqttConfig;
use crate::ingest::IngestBridge;
use crate::mqtt;

pub struct SensorFeedActor {
    client: AsyncClient,
    eventloop: EventLoop,
    bridge: IngestBridge,
    qos: QoS,
    reconnect_delay: Duration,
    command_rx: mpsc::Receiver<SensorFeedCommand>,
}

impl SensorFeedActor {
    pub fn new(
        config: &MqttConfig,
        bridge: IngestBridge,
        command_rx: mpsc::Receiver<SensorFeedCommand>,
    ) -> Self {
        let (client, eventloop) = mqtt::new(mqtt::build_options(config));

        Self {
            client,
            eventloop,
            bridge,
            qos: mqtt::qos(config.qos),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs.max(1)),
            command_rx,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting sensor feed actor");

        loop {
            tokio::select! {
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("connected to MQTT broker");
                            self.subscribe();
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            trace!("message on {}", publish.topic);
                            if let Err(e) = self
                                .bridge
                                .handle_message(&publish.topic, &publish.payload)
                                .await
                            {
                                warn!("dropping message on {}: {e:#}", publish.topic);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("MQTT connection error: {e}");
                            self.bridge.mark_error(e.to_string()).await;
                            if self.wait_before_reconnect().await {
                                break;
                            }
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SensorFeedCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            trace!("disconnect failed: {e}");
        }
        debug!("sensor feed actor stopped");
    }

    fn subscribe(&self) {
        for topic in self.bridge.topics().all() {
            // try_subscribe only queues the request; the event loop sends it
            match self.client.try_subscribe(topic, self.qos) {
                Ok(()) => debug!("subscribed to {topic}"),
                Err(e) => error!("failed to subscribe to {topic}: {e}"),
            }
        }
    }

    /// Sleep before the next connection attempt. Returns `true` if a shutdown
    /// arrived in the meantime.
    async fn wait_before_reconnect(&mut self) -> bool {
        tokio::select! {
            _ = time::sleep(self.reconnect_delay) => false,
            Some(SensorFeedCommand::Shutdown) = self.command_rx.recv() => true,
        }
    }
}

/// Handle for controlling the SensorFeedActor
#[derive(Clone)]
pub struct SensorFeedHandle {
    sender: mpsc::Sender<SensorFeedCommand>,
}

impl SensorFeedHandle {
    pub fn spawn(config: &MqttConfig, bridge: IngestBridge) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = SensorFeedActor::new(config, bridge, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(SensorFeedCommand::Shutdown).await;
    }
}
