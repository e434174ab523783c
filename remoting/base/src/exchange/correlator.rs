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
    atomic::{AtomicI32, AtomicU64, Ordering},
    Arc,
};

use courier_logger::tracing;
use dashmap::{mapref::entry::Entry, DashMap};
use protocol_base::{CallResponse, RequestId, HEARTBEAT_REQUEST_ID};
use tokio::sync::oneshot;

use crate::error::RemotingError;

type Completion = oneshot::Sender<Result<CallResponse, RemotingError>>;

static REQUEST_IDS: RequestIdGenerator = RequestIdGenerator::new();

/// Next id from the sequence shared by every client in the process.
pub fn next_request_id() -> RequestId {
    REQUEST_IDS.next_id()
}

/// Hands out request ids. Ids start at 1, wrap around and never yield the
/// heartbeat id.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicI32,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdGenerator {
    pub const fn new() -> Self {
        RequestIdGenerator {
            next: AtomicI32::new(1),
        }
    }

    pub fn starting_at(first: RequestId) -> Self {
        RequestIdGenerator {
            next: AtomicI32::new(first),
        }
    }

    pub fn next_id(&self) -> RequestId {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != HEARTBEAT_REQUEST_ID {
                return id;
            }
        }
    }
}

/// Table of outstanding calls on one connection, keyed by request id.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: Arc<DashMap<RequestId, Completion>>,
    discarded: AtomicU64,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request_id: RequestId) -> Result<PendingCall, RemotingError> {
        let (tx, rx) = oneshot::channel();
        match self.pending.entry(request_id) {
            Entry::Occupied(_) => return Err(RemotingError::DuplicateRequestId(request_id)),
            Entry::Vacant(entry) => {
                entry.insert(tx);
            }
        }
        Ok(PendingCall {
            request_id,
            rx,
            pending: self.pending.clone(),
        })
    }

    /// Completes the waiting caller. Late or unknown responses are dropped.
    pub fn resolve(&self, request_id: RequestId, response: CallResponse) -> bool {
        match self.pending.remove(&request_id) {
            Some((_, tx)) => tx.send(Ok(response)).is_ok(),
            None => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "discarding response {} with no waiting caller",
                    request_id
                );
                false
            }
        }
    }

    pub fn fail_all(&self, reason: &str) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for request_id in ids {
            if let Some((_, tx)) = self.pending.remove(&request_id) {
                let _ = tx.send(Err(RemotingError::Connection(reason.to_string())));
                failed += 1;
            }
        }
        failed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// A registered call. Dropping it unregisters the id, so a response that
/// arrives after a timeout finds no waiter.
#[derive(Debug)]
pub struct PendingCall {
    request_id: RequestId,
    rx: oneshot::Receiver<Result<CallResponse, RemotingError>>,
    pending: Arc<DashMap<RequestId, Completion>>,
}

impl PendingCall {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub async fn wait(mut self) -> Result<CallResponse, RemotingError> {
        match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => Err(RemotingError::Connection(format!(
                "request {} was abandoned",
                self.request_id
            ))),
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.pending.remove(&self.request_id);
    }
}
