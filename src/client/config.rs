// Session configuration: the recognized option set the engine consumes.

use crate::client::{EsmeError, EsmeResult};
use crate::datatypes::{
    BindMode, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH, MAX_SYSTEM_ID_LENGTH,
    MAX_SYSTEM_TYPE_LENGTH, Npi, Ton,
};
use crate::encoding::CodecRegistry;
use crate::macros::builder_setters;
use rand::Rng;
use std::time::Duration;

/// Configuration for one ESME session.
#[derive(Clone, Debug)]
pub struct EsmeConfig {
    pub smsc_host: String,
    pub smsc_port: u16,
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub addr_ton: Ton,
    pub addr_npi: Npi,
    pub address_range: String,
    pub bind_mode: BindMode,
    /// Identifies this client instance in logs and hooks. Generated when
    /// left empty.
    pub client_id: String,
    pub enquire_link_interval: Duration,
    pub socket_timeout: Duration,
    /// The SMSC default alphabet (the v3.4 specification does not pin one
    /// down, so it is configuration).
    pub default_encoding: String,
}

impl EsmeConfig {
    pub fn new(
        smsc_host: impl Into<String>,
        smsc_port: u16,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        EsmeConfig {
            smsc_host: smsc_host.into(),
            smsc_port,
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            addr_ton: Ton::Unknown,
            addr_npi: Npi::Unknown,
            address_range: String::new(),
            bind_mode: BindMode::Transceiver,
            client_id: generated_client_id(),
            enquire_link_interval: Duration::from_secs(55),
            socket_timeout: Duration::from_secs(30),
            default_encoding: "gsm0338".to_owned(),
        }
    }

    builder_setters! {
        system_type: String,
        addr_ton: Ton,
        addr_npi: Npi,
        address_range: String,
        bind_mode: BindMode,
        client_id: String,
        enquire_link_interval: Duration,
        socket_timeout: Duration,
        default_encoding: String,
    }

    pub fn validate(&self, registry: &CodecRegistry) -> EsmeResult<()> {
        if self.smsc_host.is_empty() {
            return Err(EsmeError::Validation("smsc_host is empty".into()));
        }
        if self.system_id.len() > MAX_SYSTEM_ID_LENGTH {
            return Err(EsmeError::Validation("system_id exceeds 15 characters".into()));
        }
        if self.password.len() > MAX_PASSWORD_LENGTH {
            return Err(EsmeError::Validation("password exceeds 8 characters".into()));
        }
        if self.system_type.len() > MAX_SYSTEM_TYPE_LENGTH {
            return Err(EsmeError::Validation("system_type exceeds 12 characters".into()));
        }
        if self.address_range.len() > MAX_ADDRESS_RANGE_LENGTH {
            return Err(EsmeError::Validation(
                "address_range exceeds 40 characters".into(),
            ));
        }
        registry
            .lookup(&self.default_encoding)
            .map_err(|err| EsmeError::Validation(err.to_string()))?;
        Ok(())
    }
}

fn generated_client_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..17)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
