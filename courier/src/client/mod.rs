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

pub mod blocking;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use courier_base::constants::DEFAULT_CALL_TIMEOUT_MS;
use courier_config::{ConfigError, RootConfig};
use courier_logger::tracing;
use protocol_base::CallRequest;
use remoting_base::{
    next_request_id, BoxedSerialization, ConnectOptions, ConnectionManager, JsonSerialization,
    SerializationRegistry,
};
use serde_json::Value;

use crate::{
    cluster::{self, BoxLoadBalance, RandomLoadBalance},
    error::RpcError,
    registry::{BoxRegistry, ServiceDirectory, StaticRegistry},
};

pub struct ClientBuilder {
    registry: Option<BoxRegistry>,
    load_balance: BoxLoadBalance,
    call_timeout: Option<Duration>,
    connect_options: ConnectOptions,
    serialization: BoxedSerialization,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder {
            registry: None,
            load_balance: Arc::new(RandomLoadBalance::default()),
            call_timeout: Some(Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS)),
            connect_options: ConnectOptions::default(),
            serialization: Arc::new(JsonSerialization),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls go straight to `address` without a name service.
    pub fn from_static(address: impl Into<String>) -> Self {
        Self::new().with_registry(Arc::new(StaticRegistry::new(vec![address.into()])))
    }

    /// Takes timeouts, load balancing, heartbeat, frame limit and serialization
    /// from `config`. The registry is attached separately.
    pub fn from_config(config: &RootConfig) -> Result<Self, ConfigError> {
        let load_balance = cluster::from_name(&config.consumer.load_balance).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unknown load balance {}",
                config.consumer.load_balance
            ))
        })?;
        let serialization = SerializationRegistry::default()
            .get_serialization(&config.protocol.serialization)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown serialization {}",
                    config.protocol.serialization
                ))
            })?;
        Ok(Self::new()
            .with_load_balance(load_balance)
            .with_call_timeout(config.consumer.call_timeout())
            .with_connect_timeout(config.consumer.connect_timeout())
            .with_ping_interval(config.protocol.heartbeat.ping_interval())
            .with_max_frame_length(config.protocol.max_frame_length)
            .with_serialization(serialization))
    }

    pub fn with_registry(self, registry: BoxRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..self
        }
    }

    pub fn with_load_balance(self, load_balance: BoxLoadBalance) -> Self {
        Self {
            load_balance,
            ..self
        }
    }

    /// `None` lets calls wait for their response indefinitely.
    pub fn with_call_timeout(self, call_timeout: Option<Duration>) -> Self {
        Self {
            call_timeout,
            ..self
        }
    }

    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_options: self
                .connect_options
                .clone()
                .with_connect_timeout(connect_timeout),
            ..self
        }
    }

    pub fn with_ping_interval(self, ping_interval: Duration) -> Self {
        Self {
            connect_options: self
                .connect_options
                .clone()
                .with_ping_interval(ping_interval),
            ..self
        }
    }

    pub fn with_max_frame_length(self, max_frame_length: usize) -> Self {
        Self {
            connect_options: self
                .connect_options
                .clone()
                .with_max_frame_length(max_frame_length),
            ..self
        }
    }

    pub fn with_serialization(self, serialization: BoxedSerialization) -> Self {
        Self {
            serialization,
            ..self
        }
    }

    pub fn build(self) -> Result<RpcClient, RpcError> {
        let registry = self
            .registry
            .ok_or_else(|| RpcError::Discovery("no registry configured".to_string()))?;
        Ok(RpcClient {
            inner: Arc::new(ClientInner {
                directory: ServiceDirectory::new(registry.clone()),
                registry,
                load_balance: self.load_balance,
                connections: ConnectionManager::new(self.connect_options, self.serialization),
                call_timeout: self.call_timeout,
                pruned_revision: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
            }),
        })
    }
}

/// Calls remote methods by name. Cloning is cheap; clones share connections,
/// and the discovery cache. Request ids come from one process-wide sequence.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    directory: ServiceDirectory,
    registry: BoxRegistry,
    load_balance: BoxLoadBalance,
    connections: ConnectionManager,
    call_timeout: Option<Duration>,
    pruned_revision: AtomicU64,
    shutdown: AtomicBool,
}

impl RpcClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub async fn invoke(
        &self,
        interface_name: &str,
        method_name: &str,
        parameter_types: Vec<String>,
        parameters: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let inner = &self.inner;
        let addresses = inner.directory.list(interface_name).await?;
        let address = inner.load_balance.select(&addresses).ok_or_else(|| {
            RpcError::Discovery(format!("no provider available for {}", interface_name))
        })?;
        self.prune_connections();
        let connection = inner.connections.acquire(address).await?;

        let request = CallRequest::new(interface_name, method_name)
            .with_request_id(next_request_id())
            .with_parameter_types(parameter_types)
            .with_parameters(parameters);
        tracing::debug!(
            "calling {} on {} as request {}",
            request.signature(),
            address,
            request.request_id
        );
        let response = connection.request(request, inner.call_timeout).await?;
        response.into_result().map_err(RpcError::from)
    }

    // drops connections to providers that left every service list
    fn prune_connections(&self) {
        let inner = &self.inner;
        let revision = inner.directory.revision();
        if inner.pruned_revision.swap(revision, Ordering::SeqCst) == revision {
            return;
        }
        let known = inner.directory.known_addresses();
        let evicted = inner.connections.retain(|address| known.contains(address));
        if evicted > 0 {
            tracing::debug!("released {} connections to departed providers", evicted);
        }
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.inner.directory
    }

    /// Number of connections opened so far.
    pub fn connect_count(&self) -> usize {
        self.inner.connections.connect_count()
    }

    /// Number of cached connections, live or not yet evicted.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.inner.call_timeout
    }

    /// Closes every connection, failing calls still waiting, and the registry.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.connections.shutdown();
        self.inner.registry.close().await;
        tracing::info!("client shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use protocol_base::CallResponse;
    use remoting_base::{serve_connection, ExchangeHandler, ServeOptions};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::registry::MemoryRegistry;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<i32>>,
    }

    #[async_trait]
    impl ExchangeHandler for RecordingHandler {
        async fn handle(&self, request: CallRequest) -> CallResponse {
            self.seen.lock().unwrap().push(request.request_id);
            CallResponse::ok(request.request_id, json!(request.request_id))
        }
    }

    #[tokio::test]
    async fn test_clients_share_request_ids() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let handler = Arc::new(RecordingHandler::default());
        let shutdown = CancellationToken::new();
        {
            let handler = handler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let (stream, peer) = listener.accept().await.unwrap();
                    tokio::spawn(serve_connection(
                        stream,
                        peer.to_string(),
                        handler.clone(),
                        ServeOptions::default(),
                        Arc::new(JsonSerialization),
                        shutdown.clone(),
                    ));
                }
            });
        }

        let first = ClientBuilder::from_static(address.clone()).build().unwrap();
        let second = ClientBuilder::from_static(address).build().unwrap();
        for client in [&first, &second, &first, &second] {
            client
                .invoke("org.demo.Greeter", "greet", vec![], vec![])
                .await
                .unwrap();
        }

        let mut seen = handler.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 4);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 4);
        shutdown.cancel();
    }

    #[test]
    fn test_build_requires_registry() {
        assert!(matches!(
            ClientBuilder::new().build(),
            Err(RpcError::Discovery(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let mut config = RootConfig::default();
        config.consumer.call_timeout_ms = 0;
        config.consumer.load_balance = "round_robin".to_string();
        let client = ClientBuilder::from_config(&config)
            .unwrap()
            .with_registry(Arc::new(MemoryRegistry::new()))
            .build()
            .unwrap();
        assert_eq!(client.call_timeout(), None);
        assert_eq!(client.inner.load_balance.name(), "round_robin");

        config.protocol.serialization = "hessian2".to_string();
        assert!(ClientBuilder::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_no_provider() {
        let client = ClientBuilder::new()
            .with_registry(Arc::new(MemoryRegistry::new()))
            .build()
            .unwrap();
        let err = client
            .invoke("org.demo.Greeter", "greet", vec![], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Discovery(_)));
        assert_eq!(client.connect_count(), 0);
    }
}
