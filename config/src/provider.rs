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

use courier_base::{
    constants::{DEFAULT_PROVIDER_HOST, DEFAULT_PROVIDER_PORT},
    Address,
};
use courier_logger::tracing;
use courier_utils::host_util::{is_unspecified_host, local_ip};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProviderConfig {
    /// host published to the registry; empty or 0.0.0.0 means this machine's ip
    pub host: String,
    pub port: u16,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            host: DEFAULT_PROVIDER_HOST.to_string(),
            port: DEFAULT_PROVIDER_PORT,
        }
    }
}

impl ProviderConfig {
    pub fn host(self, host: String) -> Self {
        Self { host, ..self }
    }

    pub fn port(self, port: u16) -> Self {
        Self { port, ..self }
    }

    pub fn advertise_address(&self) -> Address {
        if !is_unspecified_host(&self.host) {
            return Address::new(self.host.trim(), self.port);
        }
        match local_ip() {
            Some(ip) => Address::new(ip.to_string(), self.port),
            None => {
                tracing::warn!(
                    "cannot resolve local ip, advertising {}",
                    DEFAULT_PROVIDER_HOST
                );
                Address::new(DEFAULT_PROVIDER_HOST, self.port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertise_configured_host() {
        let provider = ProviderConfig::default()
            .host("10.0.0.7".to_string())
            .port(9000);
        assert_eq!(provider.advertise_address().to_string(), "10.0.0.7:9000");
    }

    #[test]
    fn test_advertise_unspecified_host() {
        let provider = ProviderConfig::default().host("0.0.0.0".to_string());
        let addr = provider.advertise_address();
        assert_ne!(addr.host, "0.0.0.0");
        assert_eq!(addr.port, 8080);
    }
}
