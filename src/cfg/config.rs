// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::Gender;

/// Top-level configuration record. Constructed once (from YAML) and handed
/// to a session at connect time; nothing in the session mutates it.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub identity: Identity,
    pub rsa: RsaKey,
    pub packet_ids: PacketIds,
    #[serde(default)]
    pub admins: Vec<String>,
    /// Off by default: seeing a configured admin in a room only triggers an
    /// automatic quit when this is explicitly turned on.
    #[serde(default)]
    pub admin_auto_leave: bool,
    #[serde(default)]
    pub personalization: Personalization,
    #[serde(with = "serde_secs", default = "default_keepalive")]
    pub keepalive_interval: Duration,
    #[serde(with = "serde_secs", default = "default_auth_timeout")]
    pub auth_timeout: Duration,
    #[serde(with = "serde_secs", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "serde_secs", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

fn default_keepalive() -> Duration {
    Duration::from_secs(20)
}
fn default_auth_timeout() -> Duration {
    Duration::from_secs(15)
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Network-level connection parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Network {
    pub host: String,
    pub port: u16,
    /// `host:port` or `host:port:user:pass`, resolved through the proxy.
    #[serde(default)]
    pub socks_proxy: Option<String>,
}

/// Identity strings required by the server's version check / login triad.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Identity {
    pub release_version: String,
    pub client_type: String,
    pub platform_id: i32,
    pub client_version: i32,
    pub external_variables_url: String,
    pub platform_string: String,
    /// Opaque device fingerprint sent with the unique-id packet. The caller
    /// owns how this is derived; the core treats it as an opaque string.
    pub device_fingerprint: String,
}

/// The server's RSA public key, hex-encoded.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RsaKey {
    pub modulus_hex: String,
    pub exponent_hex: String,
}

/// Incoming (server-to-client) packet identifiers the dispatcher matches on.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IncomingIds {
    pub server_dh_init: u16,
    pub server_dh_complete: u16,
    pub authentication_ok: u16,
    pub ping: u16,
    pub flood_control: u16,
    pub users: u16,
    pub user_remove: u16,
    pub floor_height_map: u16,
    pub height_map: u16,
    pub navigator_results: u16,
    pub flat_created: u16,
    pub user_object: u16,
    pub noobness_level: u16,
    pub position_update: u16,
    pub chat: u16,
    #[serde(default = "default_explicit_ban")]
    pub explicit_ban: u16,
    #[serde(default = "default_disconnect_reason")]
    pub disconnect_reason: u16,
}

fn default_explicit_ban() -> u16 {
    1510
}
fn default_disconnect_reason() -> u16 {
    4000
}

/// Outgoing (client-to-server) packet identifiers for the handshake, login
/// triad, and the action composer surface.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutgoingIds {
    pub client_hello: u16,
    pub dh_init: u16,
    pub dh_complete: u16,
    pub version_check: u16,
    pub unique_id: u16,
    pub sso_ticket: u16,
    pub info_retrieve: u16,
    pub pong: u16,
    pub latency_ping_request: u16,
    pub shout: u16,
    pub whisper: u16,
    pub walk: u16,
    pub join_room: u16,
    pub join_room_flat: u16,
    pub join_room_ready: u16,
    pub join_room_nav_request: u16,
    pub quit_room: u16,
    pub change_motto: u16,
    pub update_figure: u16,
    pub request_friend: u16,
    pub change_username: u16,
    pub dance: u16,
    pub sign: u16,
    pub change_posture: u16,
    pub respect_user: u16,
    pub replenish_respect: u16,
    pub reward_status: u16,
    pub reward_claim: u16,
    pub purchase_item: u16,
    pub effect_activate: u16,
    pub effect_select: u16,
    pub search_navigator: u16,
    pub select_initial_room: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PacketIds {
    pub incoming: IncomingIds,
    pub outgoing: OutgoingIds,
}

/// Per-gender appearance strings used by the first-login personalization
/// flow.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Personalization {
    #[serde(default)]
    pub appearances_male: Vec<String>,
    #[serde(default)]
    pub appearances_female: Vec<String>,
}

impl Personalization {
    pub fn appearances_for(&self, gender: Gender) -> &[String] {
        match gender {
            Gender::Male => &self.appearances_male,
            Gender::Female => &self.appearances_female,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants that would otherwise surface as confusing
    /// handshake failures deep inside the session.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.network.host.is_empty(), "network.host must not be empty");
        ensure!(self.network.port != 0, "network.port must not be zero");

        if let Some(proxy) = &self.network.socks_proxy {
            let parts: Vec<&str> = proxy.split(':').collect();
            ensure!(
                parts.len() == 2 || parts.len() == 4,
                "socks_proxy must be 'host:port' or 'host:port:user:pass'"
            );
            ensure!(
                parts[1].parse::<u16>().is_ok(),
                "socks_proxy port must be numeric"
            );
        }

        ensure!(
            !self.rsa.modulus_hex.is_empty() && !self.rsa.exponent_hex.is_empty(),
            "rsa.modulus_hex and rsa.exponent_hex are required"
        );
        ensure!(
            hex::decode(self.rsa.modulus_hex.trim_start_matches("0x")).is_ok(),
            "rsa.modulus_hex is not valid hex"
        );
        ensure!(
            hex::decode(self.rsa.exponent_hex.trim_start_matches("0x")).is_ok(),
            "rsa.exponent_hex is not valid hex"
        );

        self.admins = self.admins.iter().map(|a| a.to_lowercase()).collect();

        Ok(())
    }

    pub fn is_admin(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.admins.iter().any(|a| a == &lower)
    }
}

/// Serde helper representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
network:
  host: "game.example.com"
  port: 30000
identity:
  release_version: "1"
  client_type: "WEB"
  platform_id: 1
  client_version: 1
  external_variables_url: "https://example.com/vars"
  platform_string: "WIN"
  device_fingerprint: "abc123"
rsa:
  modulus_hex: "a1b2"
  exponent_hex: "03"
packet_ids:
  incoming:
    server_dh_init: 1
    server_dh_complete: 2
    authentication_ok: 3
    ping: 4
    flood_control: 5
    users: 6
    user_remove: 7
    floor_height_map: 8
    height_map: 9
    navigator_results: 10
    flat_created: 11
    user_object: 12
    noobness_level: 13
    position_update: 14
    chat: 15
  outgoing:
    client_hello: 100
    dh_init: 101
    dh_complete: 102
    version_check: 103
    unique_id: 104
    sso_ticket: 105
    info_retrieve: 106
    pong: 107
    latency_ping_request: 108
    shout: 109
    whisper: 110
    walk: 111
    join_room: 112
    join_room_flat: 113
    join_room_ready: 114
    join_room_nav_request: 115
    quit_room: 116
    change_motto: 117
    update_figure: 118
    request_friend: 119
    change_username: 120
    dance: 121
    sign: 122
    change_posture: 123
    respect_user: 124
    replenish_respect: 125
    reward_status: 126
    reward_claim: 127
    purchase_item: 128
    effect_activate: 129
    effect_select: 130
    search_navigator: 131
    select_initial_room: 132
"#
    }

    #[test]
    fn loads_and_defaults_ban_codes() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).expect("parse");
        cfg.validate_and_normalize().expect("validate");
        assert_eq!(cfg.packet_ids.incoming.explicit_ban, 1510);
        assert_eq!(cfg.packet_ids.incoming.disconnect_reason, 4000);
        assert_eq!(cfg.keepalive_interval, Duration::from_secs(20));
    }

    #[test]
    fn rejects_malformed_proxy() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).expect("parse");
        cfg.network.socks_proxy = Some("not-a-proxy".to_string());
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn admin_match_is_case_insensitive() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).expect("parse");
        cfg.admins = vec!["AdminName".to_string()];
        cfg.validate_and_normalize().expect("validate");
        assert!(cfg.is_admin("adminname"));
        assert!(!cfg.is_admin("someone-else"));
    }
}
