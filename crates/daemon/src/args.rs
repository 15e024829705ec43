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

use clap::builder::ValueHint;
use clap_derive::Parser;
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format as ProviderFormat, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use storelink_daemon::config::Config;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(version, about = "Confirms store purchases with the players who made them")]
pub struct Args {
    #[arg(
        long,
        value_name = "config",
        help = "Path to configuration (YAML) file to use, if any. If not specified, defaults are used.\
                Configuration file values can be overridden by command line arguments.",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "listen",
        help = "Address stores connect to with authentication requests"
    )]
    pub listen: Option<SocketAddr>,

    #[arg(
        long,
        value_name = "presence-listen",
        help = "Address game servers connect to with player presence updates"
    )]
    pub presence_listen: Option<SocketAddr>,

    #[arg(
        long,
        value_name = "key-file",
        help = "File containing the age identity shared with the store. Frames are sent in the clear without one.",
        value_hint = ValueHint::FilePath
    )]
    pub key_file: Option<PathBuf>,

    #[arg(long, help = "Enable debug logging", default_value = "false")]
    pub debug: bool,

    #[arg(
        long,
        help = "Generate a shared key and exit. Written to --key-file if given, printed otherwise."
    )]
    pub generate_key: bool,
}

impl Args {
    fn merge_config(&self, mut config: Config) -> Config {
        if let Some(listen) = self.listen {
            config.listen.requests = listen;
        }
        if let Some(presence) = self.presence_listen {
            config.listen.presence = Some(presence);
        }
        if let Some(key_file) = &self.key_file {
            config.encryption.key_file = Some(key_file.clone());
        }
        config
    }

    /// Load the configuration file if we have it, then apply command line overrides on top.
    pub fn load_config(&self) -> Result<Config, eyre::Report> {
        let config = match &self.config_file {
            Some(config_path) => Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Yaml::file(config_path))
                .extract::<Config>()
                .map_err(|e| {
                    eyre!(
                        "Failed to parse configuration from {:?}: {}",
                        config_path,
                        e
                    )
                })?,
            None => Config::default(),
        };
        Ok(self.merge_config(config))
    }
}
