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

use std::time::Duration;

use courier::{registry, ClientBuilder};
use courier_config::get_root_config;
use courier_demos::greeter::GreeterClient;
use courier_logger::tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_logger::init();

    registry_zookeeper::install();
    let config = get_root_config()?;
    let registry = registry::create_registry(&config.registry)?;
    let client = ClientBuilder::from_config(config)?
        .with_registry(registry)
        .build()?;
    let greeter = GreeterClient::new(client.clone());

    // using loop for load balance test
    for i in 0..10 {
        match greeter.greet(format!("courier-{}", i)).await {
            Ok(reply) => info!("reply: {}", reply),
            Err(err) => error!("call failed: {}", err),
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    info!("served so far: {}", greeter.greet_count().await?);
    client.shutdown().await;
    Ok(())
}
