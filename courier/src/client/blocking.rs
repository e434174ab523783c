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

use std::future::Future;

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use super::{ClientBuilder, RpcClient};
use crate::error::RpcError;

/// Synchronous front of [RpcClient]. The calling thread blocks until the
/// response arrives; any number of threads may call at once.
pub struct BlockingClient {
    runtime: Runtime,
    client: RpcClient,
}

impl BlockingClient {
    pub fn new(builder: ClientBuilder) -> Result<Self, RpcError> {
        let runtime = Builder::new_multi_thread()
            .thread_name("courier-client")
            .enable_all()
            .build()?;
        let client = builder.build()?;
        Ok(BlockingClient { runtime, client })
    }

    pub fn invoke(
        &self,
        interface_name: &str,
        method_name: &str,
        parameter_types: Vec<String>,
        parameters: Vec<Value>,
    ) -> Result<Value, RpcError> {
        self.runtime.block_on(self.client.invoke(
            interface_name,
            method_name,
            parameter_types,
            parameters,
        ))
    }

    /// Runs `future` to completion on the client's runtime, e.g. a generated stub call.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn shutdown(self) {
        self.runtime.block_on(self.client.shutdown());
    }
}
