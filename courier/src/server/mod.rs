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

pub mod dispatcher;
pub mod service;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use courier_base::Address;
use courier_config::{ConfigError, RootConfig};
use courier_logger::tracing;
use dashmap::DashMap;
use remoting_base::{
    serve_connection, BoxedSerialization, ExchangeHandler, JsonSerialization, ServeOptions,
    SerializationRegistry,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{error::RpcError, registry::BoxRegistry};

use self::{dispatcher::Dispatcher, service::RpcService};

/// Accepts connections and answers requests for the published services.
///
/// ```no_run
/// # async fn run(service: std::sync::Arc<dyn courier::RpcService>) -> Result<(), courier::RpcError> {
/// let server = courier::RpcServer::new();
/// server.publish_service(service).await;
/// server.start(8080).await
/// # }
/// ```
pub struct RpcServer {
    dispatcher: Dispatcher,
    registry: Option<BoxRegistry>,
    advertise_address: Address,
    serve_options: ServeOptions,
    serialization: BoxedSerialization,
    published: DashMap<String, String>,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServer {
    pub fn new() -> Self {
        RpcServer {
            dispatcher: Dispatcher::new(),
            registry: None,
            advertise_address: RootConfig::default().provider.advertise_address(),
            serve_options: ServeOptions::default(),
            serialization: Arc::new(JsonSerialization),
            published: DashMap::new(),
            shutdown: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Takes the advertised address, heartbeat, frame limit and serialization
    /// from `config`. The registry is attached separately.
    pub fn from_config(config: &RootConfig) -> Result<Self, ConfigError> {
        let serialization = SerializationRegistry::default()
            .get_serialization(&config.protocol.serialization)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown serialization {}",
                    config.protocol.serialization
                ))
            })?;
        Ok(Self::new()
            .with_advertise_address(config.provider.advertise_address())
            .with_idle_timeout(config.protocol.heartbeat.idle_timeout())
            .with_max_frame_length(config.protocol.max_frame_length)
            .with_serialization(serialization))
    }

    pub fn with_registry(self, registry: BoxRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..self
        }
    }

    pub fn with_advertise_address(self, advertise_address: Address) -> Self {
        Self {
            advertise_address,
            ..self
        }
    }

    pub fn with_idle_timeout(self, idle_timeout: Duration) -> Self {
        Self {
            serve_options: self.serve_options.clone().with_idle_timeout(idle_timeout),
            ..self
        }
    }

    pub fn with_max_frame_length(self, max_frame_length: usize) -> Self {
        Self {
            serve_options: self
                .serve_options
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

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn advertise_address(&self) -> &Address {
        &self.advertise_address
    }

    /// Makes `service` callable and announces it to the registry. A registry
    /// failure is logged; the service is still served.
    pub async fn publish_service(&self, service: Arc<dyn RpcService>) {
        let name = service.interface_name().to_string();
        if self.dispatcher.register(service).is_some() {
            tracing::warn!("service {} was already published, replaced", name);
        }
        tracing::info!("published service {}", name);

        let registry = match &self.registry {
            Some(registry) => registry,
            None => return,
        };
        let address = self.advertise_address.to_string();
        match registry.register(&name, &address).await {
            Ok(()) => {
                tracing::info!("registered {} at {}", name, address);
                self.published.insert(name, address);
            }
            Err(err) => tracing::error!("failed to register {} at {}: {}", name, address, err),
        }
    }

    /// Binds all interfaces on `port` and serves until [RpcServer::stop].
    pub async fn start(&self, port: u16) -> Result<(), RpcError> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<(), RpcError> {
        let local_addr = listener.local_addr()?;
        if !self.advertises(local_addr) {
            tracing::warn!(
                "listening on {} but the registry advertises {}",
                local_addr,
                self.advertise_address
            );
        }
        let handler: Arc<dyn ExchangeHandler> = Arc::new(self.dispatcher.clone());
        tracing::info!(
            "serving {:?} on {}",
            self.dispatcher.service_names(),
            local_addr
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("server on {} stopped", local_addr);
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(err) = stream.set_nodelay(true) {
                            tracing::debug!("set_nodelay for {} failed: {}", peer, err);
                        }
                        tracing::debug!("accepted connection from {}", peer);
                        tokio::spawn(serve_connection(
                            stream,
                            peer.to_string(),
                            handler.clone(),
                            self.serve_options.clone(),
                            self.serialization.clone(),
                            self.shutdown.clone(),
                        ));
                    }
                    Err(err) => {
                        tracing::warn!("accept on {} failed: {}", local_addr, err);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stops accepting, closes open connections and withdraws the published
    /// services from the registry.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();

        if let Some(registry) = &self.registry {
            let published: Vec<(String, String)> = self
                .published
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect();
            for (service, address) in published {
                if let Err(err) = registry.unregister(&service, &address).await {
                    tracing::warn!("failed to unregister {} at {}: {}", service, address, err);
                }
            }
            registry.close().await;
        }
        self.published.clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether callers that discover this server reach `local_addr`.
    pub fn advertises(&self, local_addr: SocketAddr) -> bool {
        self.advertise_address.port == local_addr.port()
    }
}
