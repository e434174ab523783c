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

use once_cell::sync::OnceCell;

pub use crate::config::RootConfig;
pub use crate::consumer::ConsumerConfig;
pub use crate::error::ConfigError;
pub use crate::location::{get_config_location, set_config_file_path};
pub use crate::protocol::{HeartbeatConfig, ProtocolConfig};
pub use crate::provider::ProviderConfig;
pub use crate::registry::RegistryConfig;

pub mod config;
pub mod consumer;
pub mod error;
pub mod location;
pub mod protocol;
pub mod provider;
pub mod registry;

static ROOT_CONFIG: OnceCell<RootConfig> = OnceCell::new();

/// Process-wide configuration, loaded from [get_config_location] on first use.
pub fn get_root_config() -> Result<&'static RootConfig, ConfigError> {
    ROOT_CONFIG.get_or_try_init(RootConfig::load)
}
