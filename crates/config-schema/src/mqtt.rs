use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, SchemaError};

use crate::provider::{check_max_len, decode_settings, settings_record};
use crate::ConfigEntity;

const ENTITY: &str = "mqtt";

const REQUIRED: &[&str] = &[
    "enabled",
    "verbose_logging",
    "hostname",
    "port",
    "clientid",
    "username",
    "password",
    "topic",
    "retain",
    "tls",
    "tls_cert_login",
    "client_cert",
    "client_key",
    "lwt_topic",
    "lwt_online",
    "lwt_offline",
    "lwt_qos",
    "publish_interval",
    "clean_session",
];

const MAX_HOSTNAME_LEN: usize = 128;
const MAX_CREDENTIAL_LEN: usize = 64;
const MAX_TOPIC_LEN: usize = 256;
const MAX_LWT_VALUE_LEN: usize = 20;
const MAX_CERT_LEN: usize = 2560;

/// Broker connection plus last-will and Home Assistant discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub enabled: bool,
    pub verbose_logging: bool,
    pub hostname: String,
    pub port: u32,
    pub clientid: String,
    pub username: String,
    pub password: String,
    pub topic: String,
    /// Seconds.
    pub publish_interval: u32,
    pub clean_session: bool,
    pub retain: bool,
    pub tls: bool,
    #[serde(default)]
    pub root_ca_cert: String,
    pub tls_cert_login: bool,
    pub client_cert: String,
    pub client_key: String,
    pub lwt_topic: String,
    pub lwt_online: String,
    pub lwt_offline: String,
    pub lwt_qos: u8,
    #[serde(default)]
    pub hass_enabled: bool,
    #[serde(default)]
    pub hass_expire: bool,
    #[serde(default)]
    pub hass_retain: bool,
    #[serde(default)]
    pub hass_topic: String,
    #[serde(default)]
    pub hass_individualpanels: bool,
}

impl MqttConfig {
    /// Connection rules only bind an enabled client.
    fn check(&self) -> Result<(), SchemaError> {
        if !self.enabled {
            return Ok(());
        }

        if self.hostname.is_empty() {
            return Err(SchemaError::out_of_range("hostname", "must not be empty"));
        }
        check_max_len("hostname", &self.hostname, MAX_HOSTNAME_LEN)?;
        check_max_len("username", &self.username, MAX_CREDENTIAL_LEN)?;
        check_max_len("password", &self.password, MAX_CREDENTIAL_LEN)?;

        check_topic("topic", &self.topic)?;
        if !self.topic.ends_with('/') {
            return Err(SchemaError::out_of_range("topic", "must end with a slash (/)"));
        }

        if self.port == 0 || self.port > 65535 {
            return Err(SchemaError::out_of_range("port", "must be between 1 and 65535"));
        }

        for (field, cert) in [
            ("root_ca_cert", &self.root_ca_cert),
            ("client_cert", &self.client_cert),
            ("client_key", &self.client_key),
        ] {
            check_max_len(field, cert, MAX_CERT_LEN)?;
        }

        check_topic("lwt_topic", &self.lwt_topic)?;
        check_max_len("lwt_online", &self.lwt_online, MAX_LWT_VALUE_LEN)?;
        check_max_len("lwt_offline", &self.lwt_offline, MAX_LWT_VALUE_LEN)?;
        if self.lwt_qos > 2 {
            return Err(SchemaError::out_of_range("lwt_qos", "must not be greater than 2"));
        }

        if !(5..=65535).contains(&self.publish_interval) {
            return Err(SchemaError::out_of_range(
                "publish_interval",
                "must be between 5 and 65535",
            ));
        }

        if self.hass_enabled {
            check_topic("hass_topic", &self.hass_topic)?;
        }
        Ok(())
    }
}

fn check_topic(field: &str, topic: &str) -> Result<(), SchemaError> {
    check_max_len(field, topic, MAX_TOPIC_LEN)?;
    if topic.contains(' ') {
        return Err(SchemaError::out_of_range(field, "must not contain spaces"));
    }
    Ok(())
}

impl ConfigEntity for MqttConfig {
    const KIND: EntityKind = EntityKind::Mqtt;

    fn validate(value: Value) -> Result<Self, SchemaError> {
        let record = into_record(ENTITY, value)?;
        let config: Self = decode_settings(ENTITY, record, REQUIRED)?;
        config.check()?;
        Ok(config)
    }

    fn to_document(&self) -> Result<Value, SchemaError> {
        settings_record(ENTITY, self).map(Value::Object)
    }
}
