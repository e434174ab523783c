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

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use courier_logger::tracing::debug;
use dashmap::DashMap;

use super::{NotifyListener, Registry, RegistryError, RegistryNotifyListener, ServiceEvent};

/// In-process registry. Every change is pushed to the subscribers of the
/// affected service.
#[derive(Default)]
pub struct MemoryRegistry {
    services: DashMap<String, Vec<String>>,
    listeners: DashMap<String, Vec<RegistryNotifyListener>>,
    closed: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> MemoryRegistry {
        MemoryRegistry::default()
    }

    pub fn subscription_count(&self, service: &str) -> usize {
        self.listeners.get(service).map_or(0, |l| l.len())
    }

    fn check_open(&self) -> Result<(), RegistryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::Closed);
        }
        Ok(())
    }

    fn addresses(&self, service: &str) -> Vec<String> {
        self.services
            .get(service)
            .map(|addresses| addresses.clone())
            .unwrap_or_default()
    }

    fn notify(&self, service: &str) {
        let listeners = match self.listeners.get(service) {
            Some(listeners) => listeners.clone(),
            None => return,
        };
        let event = ServiceEvent {
            key: service.to_string(),
            addresses: self.addresses(service),
        };
        debug!("notify {:?}", event);
        for listener in listeners {
            listener.notify(event.clone());
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        self.check_open()?;
        {
            let mut addresses = self.services.entry(service.to_string()).or_default();
            if addresses.iter().any(|a| a == address) {
                return Ok(());
            }
            addresses.push(address.to_string());
        }
        self.notify(service);
        Ok(())
    }

    async fn unregister(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        self.check_open()?;
        let removed = match self.services.get_mut(service) {
            Some(mut addresses) => {
                let before = addresses.len();
                addresses.retain(|a| a != address);
                before != addresses.len()
            }
            None => false,
        };
        if removed {
            self.notify(service);
        }
        Ok(())
    }

    async fn discover(&self, service: &str) -> Result<Vec<String>, RegistryError> {
        self.check_open()?;
        Ok(self.addresses(service))
    }

    async fn subscribe(
        &self,
        service: &str,
        listener: RegistryNotifyListener,
    ) -> Result<(), RegistryError> {
        self.check_open()?;
        self.listeners
            .entry(service.to_string())
            .or_default()
            .push(listener.clone());
        listener.notify(ServiceEvent {
            key: service.to_string(),
            addresses: self.addresses(service),
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.listeners.clear();
    }
}
