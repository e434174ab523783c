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

pub mod directory;
pub mod memory_registry;
pub mod static_registry;

use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

use async_trait::async_trait;
use courier_base::constants::{MEMORY_KEY, STATIC_KEY};
use courier_config::RegistryConfig;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;

pub use directory::ServiceDirectory;
pub use memory_registry::MemoryRegistry;
pub use static_registry::StaticRegistry;

pub type RegistryNotifyListener = Arc<dyn NotifyListener + Send + Sync + 'static>;

/// Name service contract. A service name maps to the `host:port` addresses of
/// its providers.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn register(&self, service: &str, address: &str) -> Result<(), RegistryError>;

    async fn unregister(&self, service: &str, address: &str) -> Result<(), RegistryError>;

    async fn discover(&self, service: &str) -> Result<Vec<String>, RegistryError>;

    /// Notifies `listener` with the full address list whenever it changes,
    /// starting with the current list.
    async fn subscribe(
        &self,
        service: &str,
        listener: RegistryNotifyListener,
    ) -> Result<(), RegistryError>;

    async fn close(&self);
}

pub trait NotifyListener {
    fn notify(&self, event: ServiceEvent);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEvent {
    pub key: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("discovery failed: {0}")]
    Discovery(String),
    #[error("registry is closed")]
    Closed,
}

pub type BoxRegistry = Arc<dyn Registry>;

impl Debug for dyn Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Registry")
    }
}

pub type RegistryFactory = fn(&RegistryConfig) -> Result<BoxRegistry, RegistryError>;

static REGISTRY_FACTORIES: Lazy<DashMap<String, RegistryFactory>> = Lazy::new(|| {
    let factories: DashMap<String, RegistryFactory> = DashMap::new();
    factories.insert(MEMORY_KEY.to_string(), |_| {
        Ok(Arc::new(MemoryRegistry::new()) as BoxRegistry)
    });
    factories.insert(STATIC_KEY.to_string(), |config| {
        Ok(Arc::new(StaticRegistry::new(config.addresses())) as BoxRegistry)
    });
    factories
});

/// Makes a registry implementation available to [create_registry] under `protocol`.
pub fn register_factory(protocol: &str, factory: RegistryFactory) {
    REGISTRY_FACTORIES.insert(protocol.to_string(), factory);
}

pub fn create_registry(config: &RegistryConfig) -> Result<BoxRegistry, RegistryError> {
    let factory = REGISTRY_FACTORIES
        .get(&config.protocol)
        .map(|entry| *entry.value())
        .ok_or_else(|| {
            RegistryError::Registration(format!(
                "no registry implementation for protocol {}",
                config.protocol
            ))
        })?;
    factory(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_builtin_registries() {
        let config = RegistryConfig {
            protocol: STATIC_KEY.to_string(),
            address: "10.0.0.1:9000, 10.0.0.2:9000".to_string(),
            ..Default::default()
        };
        let registry = create_registry(&config).unwrap();
        assert_eq!(
            registry.discover("org.demo.Greeter").await.unwrap(),
            vec!["10.0.0.1:9000", "10.0.0.2:9000"]
        );

        let config = RegistryConfig {
            protocol: "etcd".to_string(),
            ..Default::default()
        };
        assert!(create_registry(&config).is_err());
    }
}
