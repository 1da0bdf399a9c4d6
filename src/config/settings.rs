use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub log: LogSettings,
}

/// Address the WebSocket endpoint binds to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Connection limits and keepalive timings.
///
/// The ping period is derived from `pong_wait_ms` so that a probe always
/// goes out before the peer's read deadline expires.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HubSettings {
    pub max_connections: usize,
    pub mailbox_capacity: usize,
    /// Largest inbound message, in bytes.
    pub max_message_size: usize,
    pub pong_wait_ms: u64,
    pub write_wait_ms: u64,
}

impl HubSettings {
    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    pub fn ping_period(&self) -> Duration {
        // nine tenths never exceeds the input, so the narrowing cannot fail
        let ms = u64::try_from(u128::from(self.pong_wait_ms) * 9 / 10).unwrap_or(u64::MAX);
        Duration::from_millis(ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialHubSettings {
    pub max_connections: Option<usize>,
    pub mailbox_capacity: Option<usize>,
    pub max_message_size: Option<usize>,
    pub pong_wait_ms: Option<u64>,
    pub write_wait_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8081,
            },
            hub: HubSettings::default(),
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            mailbox_capacity: 256,
            max_message_size: 1024,
            pong_wait_ms: 30_000,
            write_wait_ms: 10_000,
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from the defaults.
    pub fn merge(self) -> Settings {
        let default = Settings::default();
        let server = self.server.unwrap_or_default();
        let hub = self.hub.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            hub: HubSettings {
                max_connections: hub.max_connections.unwrap_or(default.hub.max_connections),
                mailbox_capacity: hub
                    .mailbox_capacity
                    .unwrap_or(default.hub.mailbox_capacity)
                    .max(1),
                max_message_size: hub.max_message_size.unwrap_or(default.hub.max_message_size),
                pong_wait_ms: hub.pong_wait_ms.unwrap_or(default.hub.pong_wait_ms),
                write_wait_ms: hub.write_wait_ms.unwrap_or(default.hub.write_wait_ms),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}
