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

use std::{any::Any, sync::Arc};

use async_trait::async_trait;
use courier_logger::tracing;
use dashmap::DashMap;
use protocol_base::{CallRequest, CallResponse, RemoteError};
use remoting_base::ExchangeHandler;

use super::service::RpcService;

/// Routes requests to published services by interface name. Service code runs
/// on the blocking worker pool, never on a connection task.
#[derive(Clone, Default)]
pub struct Dispatcher {
    services: Arc<DashMap<String, Arc<dyn RpcService>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `service`, replacing one published under the same interface name.
    pub fn register(&self, service: Arc<dyn RpcService>) -> Option<Arc<dyn RpcService>> {
        let name = service.interface_name().to_string();
        self.services.insert(name, service)
    }

    pub fn remove(&self, interface_name: &str) -> Option<Arc<dyn RpcService>> {
        self.services
            .remove(interface_name)
            .map(|(_, service)| service)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn lookup(&self, request: &CallRequest) -> Result<Arc<dyn RpcService>, RemoteError> {
        let service = self
            .services
            .get(&request.interface_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RemoteError::service_not_found(&request.interface_name))?;
        let known = service
            .methods()
            .iter()
            .any(|m| m.matches(&request.method_name, &request.parameter_types));
        if !known {
            return Err(RemoteError::method_not_found(
                &request.interface_name,
                &request.method_name,
                &request.parameter_types,
            ));
        }
        Ok(service)
    }

    pub async fn dispatch(&self, request: CallRequest) -> CallResponse {
        let request_id = request.request_id;
        let signature = request.signature();
        let service = match self.lookup(&request) {
            Ok(service) => service,
            Err(err) => {
                tracing::warn!("request {} rejected: {}", request_id, err);
                return CallResponse::error(request_id, err);
            }
        };

        let CallRequest {
            method_name,
            parameters,
            ..
        } = request;
        let outcome =
            tokio::task::spawn_blocking(move || service.invoke(&method_name, parameters)).await;
        match outcome {
            Ok(Ok(value)) => CallResponse::ok(request_id, value),
            Ok(Err(err)) => {
                tracing::debug!("{} failed: {}", signature, err);
                CallResponse::error(request_id, err)
            }
            Err(err) => {
                let reason = if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                };
                tracing::error!("{} panicked: {}", signature, reason);
                CallResponse::error(
                    request_id,
                    RemoteError::invocation(format!("{} panicked: {}", signature, reason)),
                )
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(_) => "unknown panic".to_string(),
    }
}

#[async_trait]
impl ExchangeHandler for Dispatcher {
    async fn handle(&self, request: CallRequest) -> CallResponse {
        self.dispatch(request).await
    }
}
