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

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use courier_logger::tracing;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::connection::{ConnectOptions, Connection};
use crate::{error::RemotingError, serialize::BoxedSerialization};

type Slot = Arc<Mutex<Option<Arc<Connection>>>>;

/// Keeps at most one live connection per remote address. Concurrent callers
/// for an address that is still connecting wait for that attempt instead of
/// opening their own.
#[derive(Debug)]
pub struct ConnectionManager {
    options: ConnectOptions,
    serialization: BoxedSerialization,
    connections: DashMap<String, Slot>,
    connects: AtomicUsize,
    shutdown: AtomicBool,
}

impl ConnectionManager {
    pub fn new(options: ConnectOptions, serialization: BoxedSerialization) -> Self {
        ConnectionManager {
            options,
            serialization,
            connections: DashMap::new(),
            connects: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub fn serialization(&self) -> &BoxedSerialization {
        &self.serialization
    }

    pub async fn acquire(&self, address: &str) -> Result<Arc<Connection>, RemotingError> {
        loop {
            if self.is_shutdown() {
                return Err(Self::shutdown_error());
            }
            let slot = self
                .connections
                .entry(address.to_string())
                .or_default()
                .value()
                .clone();
            let mut guard = slot.lock().await;
            if self.is_shutdown() {
                if let Some(connection) = guard.take() {
                    connection.close();
                }
                return Err(Self::shutdown_error());
            }
            // evicted by retain while this caller waited for the lock
            let current = self
                .connections
                .get(address)
                .map_or(false, |entry| Arc::ptr_eq(entry.value(), &slot));
            if !current {
                continue;
            }

            if let Some(connection) = guard.as_ref() {
                if connection.is_active() {
                    return Ok(connection.clone());
                }
                tracing::debug!(
                    "connection {} to {} is closed, reconnecting",
                    connection.id(),
                    address
                );
            }

            let connection =
                Connection::connect(address, &self.options, self.serialization.clone()).await?;
            self.connects.fetch_add(1, Ordering::Relaxed);
            *guard = Some(connection.clone());

            if self.is_shutdown() {
                connection.close();
                *guard = None;
                return Err(Self::shutdown_error());
            }
            tracing::info!("opened connection {} to {}", connection.id(), address);
            return Ok(connection);
        }
    }

    /// Closes and forgets the connections whose address fails `keep`, along
    /// with slots whose connection is already closed. Slots locked by an
    /// acquire in progress are left alone. Returns the number of slots dropped.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut evicted = 0;
        self.connections.retain(|address, slot| {
            let mut guard = match slot.try_lock() {
                Ok(guard) => guard,
                Err(_) => return true,
            };
            let active = guard.as_ref().map_or(false, |c| c.is_active());
            if active && keep(address.as_str()) {
                return true;
            }
            if let Some(connection) = guard.take() {
                tracing::info!(
                    "closing connection {} to {}, no longer a provider",
                    connection.id(),
                    address
                );
                connection.close();
            }
            evicted += 1;
            false
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of connections established so far, including replaced ones.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn active_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| match entry.value().try_lock() {
                Ok(guard) => guard.as_ref().map_or(false, |c| c.is_active()),
                Err(_) => false,
            })
            .count()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        for entry in self.connections.iter() {
            // a slot still locked belongs to an acquire that sees the flag after connecting
            if let Ok(mut guard) = entry.value().try_lock() {
                if let Some(connection) = guard.take() {
                    connection.close();
                }
            }
        }
        self.connections.clear();
        tracing::info!("connection manager shut down");
    }

    fn shutdown_error() -> RemotingError {
        RemotingError::Connection("connection manager is shut down".to_string())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
