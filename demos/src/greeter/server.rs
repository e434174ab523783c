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
    atomic::{AtomicU64, Ordering},
    Arc,
};

use courier::{registry, RpcServer, ServiceError};
use courier_config::get_root_config;
use courier_demos::greeter::Greeter;
use courier_logger::{
    tracing::{info, span},
    Level,
};
use courier_macro::rpc_server;

#[derive(Default)]
struct GreeterServerImpl {
    name: String,
    served: AtomicU64,
}

#[rpc_server]
impl Greeter for GreeterServerImpl {
    fn greet(&self, name: String) -> Result<String, ServiceError> {
        info!("GreeterServer::greet {}", name);
        self.served.fetch_add(1, Ordering::Relaxed);
        Ok(format!("hello {}, from {}", name, self.name))
    }

    fn greet_count(&self) -> Result<u64, ServiceError> {
        Ok(self.served.load(Ordering::Relaxed))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_logger::init();
    let span = span!(Level::DEBUG, "greeter.server");
    let _enter = span.enter();

    registry_zookeeper::install();
    let config = get_root_config()?;
    let registry = registry::create_registry(&config.registry)?;
    let server = Arc::new(RpcServer::from_config(config)?.with_registry(registry));
    server
        .publish_service(Arc::new(GreeterServerImpl {
            name: "greeter".to_string(),
            ..Default::default()
        }))
        .await;

    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.start(config.provider.port).await })
    };
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.stop().await;
    serving.await??;
    Ok(())
}
