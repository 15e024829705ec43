// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::requests::{
    DEFAULT_CONFIRMATION_MESSAGE, DEFAULT_TICK_BUDGET, DEFAULT_TICK_INTERVAL, PollerSettings,
};
use crate::transport::DEFAULT_MAX_FRAME_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: ListenConfig,
    pub encryption: EncryptionConfig,
    pub authentication: AuthenticationConfig,
    pub max_frame_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            encryption: EncryptionConfig::default(),
            authentication: AuthenticationConfig::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Where stores connect to submit requests.
    pub requests: SocketAddr,
    /// Where game servers report presence. Disabled when absent.
    pub presence: Option<SocketAddr>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            requests: SocketAddr::from(([0, 0, 0, 0], 7890)),
            presence: Some(SocketAddr::from(([127, 0, 0, 1], 7891))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// age identity shared with the store. Frames are plaintext when unset.
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub tick_interval_ms: u64,
    pub tick_budget: u32,
    pub confirmation_message: String,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            tick_budget: DEFAULT_TICK_BUDGET,
            confirmation_message: DEFAULT_CONFIRMATION_MESSAGE.to_string(),
        }
    }
}

impl AuthenticationConfig {
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            // tokio intervals cannot have a zero period.
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            tick_budget: self.tick_budget,
            confirmation_message: self.confirmation_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_poller_defaults() {
        let config = Config::default();
        assert_eq!(
            config.authentication.poller_settings(),
            PollerSettings::default()
        );
        assert_eq!(config.listen.requests.port(), 7890);
        assert_eq!(config.max_frame_length, 64 * 1024);
        assert!(config.encryption.key_file.is_none());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let auth = AuthenticationConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            auth.poller_settings().tick_interval,
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"authentication": {"tick_budget": 5}}"#).unwrap();
        assert_eq!(config.authentication.tick_budget, 5);
        assert_eq!(config.authentication.tick_interval_ms, 1000);
        assert_eq!(config.listen, ListenConfig::default());
    }
}
