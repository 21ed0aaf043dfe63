use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use types::{into_record, EntityKind, SchemaError};

use crate::provider::{check_max_len, decode_settings, settings_record};
use crate::ConfigEntity;

const ENTITY: &str = "network";

const REQUIRED: &[&str] = &[
    "ssid",
    "password",
    "hostname",
    "dhcp",
    "ipaddress",
    "netmask",
    "gateway",
    "dns1",
    "dns2",
    "aptimeout",
];

const MAX_HOSTNAME_LEN: usize = 31;
const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 63;
const MAX_AP_TIMEOUT: u32 = 99_999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    pub hostname: String,
    pub dhcp: bool,
    pub ipaddress: String,
    pub netmask: String,
    pub gateway: String,
    pub dns1: String,
    pub dns2: String,
    /// Minutes the access point stays up after boot.
    pub aptimeout: u32,
    #[serde(default)]
    pub mdnsenabled: bool,
    #[serde(default)]
    pub modbus_tcp_enabled: bool,
    #[serde(default)]
    pub modbus_delaystart: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfrname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

impl NetworkConfig {
    fn check(&self) -> Result<(), SchemaError> {
        for (field, address) in [
            ("ipaddress", &self.ipaddress),
            ("netmask", &self.netmask),
            ("gateway", &self.gateway),
            ("dns1", &self.dns1),
            ("dns2", &self.dns2),
        ] {
            address.parse::<Ipv4Addr>().map_err(|_| {
                SchemaError::out_of_range(field, format!("`{address}` is not an IPv4 address"))
            })?;
        }

        if self.hostname.is_empty() {
            return Err(SchemaError::out_of_range("hostname", "must not be empty"));
        }
        check_max_len("hostname", &self.hostname, MAX_HOSTNAME_LEN)?;
        if self.ssid.is_empty() {
            return Err(SchemaError::out_of_range("ssid", "must not be empty"));
        }
        check_max_len("ssid", &self.ssid, MAX_SSID_LEN)?;
        check_max_len("password", &self.password, MAX_PASSWORD_LEN)?;

        if self.aptimeout > MAX_AP_TIMEOUT {
            return Err(SchemaError::out_of_range(
                "aptimeout",
                format!("must not exceed {MAX_AP_TIMEOUT}"),
            ));
        }
        Ok(())
    }
}

impl ConfigEntity for NetworkConfig {
    const KIND: EntityKind = EntityKind::Network;

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
