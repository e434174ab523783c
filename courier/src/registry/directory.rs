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

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use courier_logger::tracing;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::{BoxRegistry, NotifyListener, RegistryError, RegistryNotifyListener, ServiceEvent};

/// Local cache of provider addresses per service, kept current by registry
/// notifications. Each service is subscribed exactly once.
pub struct ServiceDirectory {
    registry: BoxRegistry,
    cache: Arc<DashMap<String, Vec<String>>>,
    subscriptions: DashMap<String, Arc<OnceCell<()>>>,
    revision: Arc<AtomicU64>,
}

struct CacheUpdater {
    cache: Arc<DashMap<String, Vec<String>>>,
    revision: Arc<AtomicU64>,
}

impl NotifyListener for CacheUpdater {
    fn notify(&self, event: ServiceEvent) {
        tracing::info!("providers of {} changed: {:?}", event.key, event.addresses);
        self.cache.insert(event.key, event.addresses);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

impl ServiceDirectory {
    pub fn new(registry: BoxRegistry) -> ServiceDirectory {
        ServiceDirectory {
            registry,
            cache: Arc::new(DashMap::new()),
            subscriptions: DashMap::new(),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bumped on every change notification.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Every address currently listed for any service.
    pub fn known_addresses(&self) -> HashSet<String> {
        self.cache
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    pub fn registry(&self) -> &BoxRegistry {
        &self.registry
    }

    /// Cached addresses of `service`, without consulting the registry.
    pub fn cached(&self, service: &str) -> Option<Vec<String>> {
        self.cache.get(service).map(|addresses| addresses.clone())
    }

    pub async fn list(&self, service: &str) -> Result<Vec<String>, RegistryError> {
        let subscription = self
            .subscriptions
            .entry(service.to_string())
            .or_default()
            .value()
            .clone();
        subscription
            .get_or_try_init(|| self.subscribe(service))
            .await?;

        if let Some(addresses) = self.cached(service) {
            if !addresses.is_empty() {
                return Ok(addresses);
            }
        }

        let addresses = self.registry.discover(service).await?;
        if !addresses.is_empty() {
            self.cache
                .entry(service.to_string())
                .and_modify(|cached| {
                    if cached.is_empty() {
                        *cached = addresses.clone()
                    }
                })
                .or_insert_with(|| addresses.clone());
        }
        Ok(addresses)
    }

    async fn subscribe(&self, service: &str) -> Result<(), RegistryError> {
        let listener: RegistryNotifyListener = Arc::new(CacheUpdater {
            cache: self.cache.clone(),
            revision: self.revision.clone(),
        });
        self.registry.subscribe(service, listener).await?;
        tracing::debug!("subscribed to {}", service);

        if !self.cache.contains_key(service) {
            let addresses = self.registry.discover(service).await?;
            self.cache.entry(service.to_string()).or_insert(addresses);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemoryRegistry, Registry};

    #[tokio::test]
    async fn test_concurrent_first_access_subscribes_once() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("svc", "10.0.0.1:9000").await.unwrap();
        let directory = Arc::new(ServiceDirectory::new(registry.clone()));

        let lookups = (0..16).map(|_| {
            let directory = directory.clone();
            async move { directory.list("svc").await.unwrap() }
        });
        for addresses in futures::future::join_all(lookups).await {
            assert_eq!(addresses, vec!["10.0.0.1:9000"]);
        }
        assert_eq!(registry.subscription_count("svc"), 1);
    }

    #[tokio::test]
    async fn test_cache_follows_notifications() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("svc", "10.0.0.1:9000").await.unwrap();
        let directory = ServiceDirectory::new(registry.clone());
        assert_eq!(directory.list("svc").await.unwrap(), vec!["10.0.0.1:9000"]);

        let revision = directory.revision();
        registry.register("svc", "10.0.0.2:9000").await.unwrap();
        registry.unregister("svc", "10.0.0.1:9000").await.unwrap();
        assert_eq!(directory.list("svc").await.unwrap(), vec!["10.0.0.2:9000"]);
        assert_eq!(directory.revision(), revision + 2);
        assert_eq!(
            directory.known_addresses(),
            HashSet::from(["10.0.0.2:9000".to_string()])
        );
    }

    #[tokio::test]
    async fn test_unknown_service_is_empty() {
        let directory = ServiceDirectory::new(Arc::new(MemoryRegistry::new()));
        assert!(directory.list("svc").await.unwrap().is_empty());
        assert_eq!(directory.cached("svc"), Some(vec![]));
    }
}
