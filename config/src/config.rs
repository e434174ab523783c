/*
 * Licensed to the Apache Software Foundation (ASF) under one or more
 * contributor license agreements.  See the NOTICE file distributed with
 * this work for additional information regarding copyright ownership.
 * The ASF licenses this file to You under the Apache License, Version 2.0
 * (the "License"); you may not use this file except in compliance with
 * the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::{collections::HashMap, path::Path};

use courier_logger::tracing;
use courier_utils::yaml_util::yaml_file_parser;
use serde::{Deserialize, Serialize};

use crate::{
    consumer::ConsumerConfig, error::ConfigError, location::get_config_location,
    protocol::ProtocolConfig, provider::ProviderConfig, registry::RegistryConfig,
};

pub const COURIER_CONFIG_PREFIX: &str = "courier";

/// used to storage all structed config, from some source: file, api..
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RootConfig {
    pub registry: RegistryConfig,
    pub provider: ProviderConfig,
    pub consumer: ConsumerConfig,
    pub protocol: ProtocolConfig,
}

impl RootConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = get_config_location();
        tracing::info!("loading config from {:?}", path);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let conf = yaml_file_parser::<HashMap<String, RootConfig>>(path.to_path_buf())
            .map_err(|err| ConfigError::from_load(path, err))?;
        Self::from_sections(conf)
    }

    pub fn from_yaml_slice(data: &[u8]) -> Result<Self, ConfigError> {
        Self::from_sections(serde_yaml::from_slice(data)?)
    }

    fn from_sections(mut conf: HashMap<String, RootConfig>) -> Result<Self, ConfigError> {
        let root_config = conf
            .remove(COURIER_CONFIG_PREFIX)
            .ok_or(ConfigError::MissingSection(COURIER_CONFIG_PREFIX))?;
        root_config.validate()?;
        tracing::debug!("origin config: {:?}", root_config);
        Ok(root_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let heartbeat = &self.protocol.heartbeat;
        if heartbeat.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "protocol.heartbeat.ping-interval-secs must be positive".to_string(),
            ));
        }
        // the acceptor must tolerate one missed ping
        if heartbeat.idle_timeout_secs < heartbeat.ping_interval_secs * 2 {
            return Err(ConfigError::Invalid(format!(
                "protocol.heartbeat.idle-timeout-secs ({}) must be at least twice ping-interval-secs ({})",
                heartbeat.idle_timeout_secs, heartbeat.ping_interval_secs
            )));
        }
        if self.protocol.max_frame_length == 0 {
            return Err(ConfigError::Invalid(
                "protocol.max-frame-length must be positive".to_string(),
            ));
        }
        if self.consumer.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "consumer.connect-timeout-ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
