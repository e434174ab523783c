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

use async_trait::async_trait;
use courier_logger::tracing::debug;

use super::{Registry, RegistryError, RegistryNotifyListener, ServiceEvent};

/// Fixed provider list shared by every service, for direct connections
/// without a name service.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    addresses: Vec<String>,
}

impl StaticRegistry {
    pub fn new(addresses: Vec<String>) -> StaticRegistry {
        StaticRegistry { addresses }
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn register(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        debug!("static registry ignores register {} -> {}", service, address);
        Ok(())
    }

    async fn unregister(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        debug!("static registry ignores unregister {} -> {}", service, address);
        Ok(())
    }

    async fn discover(&self, _service: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.addresses.clone())
    }

    async fn subscribe(
        &self,
        service: &str,
        listener: RegistryNotifyListener,
    ) -> Result<(), RegistryError> {
        listener.notify(ServiceEvent {
            key: service.to_string(),
            addresses: self.addresses.clone(),
        });
        Ok(())
    }

    async fn close(&self) {}
}
