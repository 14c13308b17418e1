use std::net::Ipv4Addr;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

const HUB_PORT: &str = "HUB_PORT";

pub const DEFAULT_PORT: u16 = 3000;

pub fn get_port() -> Option<u16> {
    non_empty_var(HUB_PORT).and_then(|res| res.parse().ok())
}

const HUB_ADDR: &str = "HUB_ADDR";

pub const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Option<Ipv4Addr> {
    non_empty_var(HUB_ADDR).and_then(|res| res.parse().ok())
}

const MQTT_HOST: &str = "MQTT_HOST";

pub fn get_mqtt_host() -> Option<String> {
    non_empty_var(MQTT_HOST)
}

const MQTT_USERNAME: &str = "MQTT_USERNAME";

pub fn get_mqtt_username() -> Option<String> {
    non_empty_var(MQTT_USERNAME)
}

const MQTT_PASSWORD: &str = "MQTT_PASSWORD";

pub fn get_mqtt_password() -> Option<String> {
    non_empty_var(MQTT_PASSWORD)
}

const EXPO_ACCESS_TOKEN: &str = "EXPO_ACCESS_TOKEN";

pub fn get_expo_access_token() -> Option<String> {
    non_empty_var(EXPO_ACCESS_TOKEN)
}
