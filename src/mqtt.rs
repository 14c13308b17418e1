//! MQTT client setup for the sensor feed

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS, Transport};
use uuid::Uuid;

use crate::config::MqttConfig;

/// Capacity of the request channel between client and event loop
const CLIENT_CAPACITY: usize = 50;

pub fn client_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

pub fn build_options(config: &MqttConfig) -> MqttOptions {
    let mut opts = MqttOptions::new(client_id(&config.client_id_prefix), &config.host, config.port);
    opts.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    opts.set_clean_session(true);
    if let (Some(u), Some(p)) = (&config.username, &config.password) {
        opts.set_credentials(u.clone(), p.clone());
    }
    if config.port == 8883 {
        opts.set_transport(Transport::tls_with_default_config());
    }
    opts
}

pub fn new(options: MqttOptions) -> (AsyncClient, EventLoop) {
    AsyncClient::new(options, CLIENT_CAPACITY)
}

pub fn qos(v: u8) -> QoS {
    match v {
        2 => QoS::ExactlyOnce,
        0 => QoS::AtMostOnce,
        _ => QoS::AtLeastOnce,
    }
}
