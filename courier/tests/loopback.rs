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

use std::{sync::Arc, time::Duration};

use courier::{
    registry::{BoxRegistry, MemoryRegistry, Registry},
    Address, BlockingClient, ClientBuilder, RpcClient, RpcError, RpcServer, ServiceError,
};
use courier_macro::{rpc_server, rpc_trait};
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};

#[rpc_trait(package = "org.demo")]
pub trait Greeter {
    fn greet(&self, name: String) -> String;
    fn divide(&self, a: i64, b: i64) -> i64;
    fn slow(&self, millis: u64) -> u64;
    fn server_name(&self) -> String;
}

struct GreeterImpl {
    name: String,
}

#[rpc_server]
impl Greeter for GreeterImpl {
    fn greet(&self, name: String) -> Result<String, ServiceError> {
        Ok(format!("Hello, {}!", name))
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        if b == 0 {
            return Err(ServiceError::new("division by zero"));
        }
        Ok(a / b)
    }

    fn slow(&self, millis: u64) -> Result<u64, ServiceError> {
        std::thread::sleep(Duration::from_millis(millis));
        Ok(millis)
    }

    fn server_name(&self) -> Result<String, ServiceError> {
        Ok(self.name.clone())
    }
}

struct Provider {
    server: Arc<RpcServer>,
    address: String,
    task: JoinHandle<Result<(), RpcError>>,
}

async fn start_provider(name: &str, registry: BoxRegistry) -> Provider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = Address::from(listener.local_addr().unwrap());
    let server = Arc::new(
        RpcServer::new()
            .with_registry(registry)
            .with_advertise_address(address.clone()),
    );
    server
        .publish_service(Arc::new(GreeterImpl {
            name: name.to_string(),
        }))
        .await;
    let task = tokio::spawn({
        let server = server.clone();
        async move { server.serve(listener).await }
    });
    Provider {
        server,
        address: address.to_string(),
        task,
    }
}

fn client(registry: BoxRegistry) -> RpcClient {
    ClientBuilder::new()
        .with_registry(registry)
        .with_call_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_typed_call() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let _provider = start_provider("a", registry.clone()).await;
    let greeter = GreeterClient::new(client(registry));

    assert_eq!(GreeterClient::INTERFACE_NAME, "org.demo.Greeter");
    assert_eq!(
        greeter.greet("courier".to_string()).await.unwrap(),
        "Hello, courier!"
    );
    assert_eq!(greeter.divide(9, 3).await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_connection() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let _provider = start_provider("a", registry.clone()).await;
    let rpc = client(registry);
    let greeter = GreeterClient::new(rpc.clone());

    let calls = (0..50).map(|i| {
        let greeter = greeter.clone();
        async move { greeter.greet(format!("caller-{}", i)).await }
    });
    let results = futures::future::join_all(calls).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), format!("Hello, caller-{}!", i));
    }
    assert_eq!(rpc.connect_count(), 1);
}

#[tokio::test]
async fn test_sequential_calls_reuse_connection() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let _provider = start_provider("a", registry.clone()).await;
    let rpc = client(registry);
    let greeter = GreeterClient::new(rpc.clone());

    for i in 0..5 {
        assert_eq!(greeter.divide(i * 10, 10).await.unwrap(), i);
    }
    assert_eq!(rpc.connect_count(), 1);
}

#[tokio::test]
async fn test_remote_error_reaches_caller() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let _provider = start_provider("a", registry.clone()).await;
    let greeter = GreeterClient::new(client(registry));

    match greeter.divide(1, 0).await {
        Err(RpcError::RemoteInvocation(err)) => assert_eq!(err.message, "division by zero"),
        other => panic!("expected a remote invocation error, got {:?}", other),
    }
    // the connection survives a failed call
    assert_eq!(greeter.divide(4, 2).await.unwrap(), 2);
}

#[tokio::test]
async fn test_unknown_method_and_service() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let provider = start_provider("a", registry.clone()).await;
    let rpc = client(registry.clone());

    let err = rpc
        .invoke("org.demo.Greeter", "wave", vec![], vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::NotFound(_)));

    let err = rpc
        .invoke(
            "org.demo.Greeter",
            "greet",
            vec!["u32".to_string()],
            vec![json!(1)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::NotFound(_)));

    // registered under a name the provider does not serve
    registry
        .register("org.demo.Missing", &provider.address)
        .await
        .unwrap();
    let err = rpc
        .invoke("org.demo.Missing", "greet", vec![], vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::NotFound(_)));
}

#[tokio::test]
async fn test_call_timeout() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let _provider = start_provider("a", registry.clone()).await;
    let rpc = ClientBuilder::new()
        .with_registry(registry)
        .with_call_timeout(Some(Duration::from_millis(50)))
        .build()
        .unwrap();
    let greeter = GreeterClient::new(rpc);

    let err = greeter.slow(500).await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout { .. }));
    assert_eq!(greeter.slow(0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_discovery_follows_notifications() {
    let memory = Arc::new(MemoryRegistry::new());
    let registry: BoxRegistry = memory.clone();
    let a = start_provider("a", registry.clone()).await;
    let rpc = client(registry.clone());
    let greeter = GreeterClient::new(rpc.clone());
    assert_eq!(greeter.server_name().await.unwrap(), "a");

    let b = start_provider("b", registry.clone()).await;
    memory
        .unregister(GreeterClient::INTERFACE_NAME, &a.address)
        .await
        .unwrap();
    for _ in 0..10 {
        assert_eq!(greeter.server_name().await.unwrap(), "b");
    }
    assert_eq!(memory.subscription_count(GreeterClient::INTERFACE_NAME), 1);
    // the connection to the departed provider is closed, not kept pinging
    assert_eq!(rpc.connect_count(), 2);
    assert_eq!(rpc.connection_count(), 1);

    memory
        .unregister(GreeterClient::INTERFACE_NAME, &b.address)
        .await
        .unwrap();
    assert!(matches!(
        greeter.server_name().await,
        Err(RpcError::Discovery(_))
    ));
}

#[tokio::test]
async fn test_stopped_server() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let provider = start_provider("a", registry.clone()).await;
    let rpc = ClientBuilder::from_static(provider.address.clone())
        .with_call_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();
    let greeter = GreeterClient::new(rpc);
    assert_eq!(greeter.server_name().await.unwrap(), "a");

    provider.server.stop().await;
    provider.server.stop().await;
    provider.task.await.unwrap().unwrap();

    let err = greeter.server_name().await.unwrap_err();
    assert!(matches!(err, RpcError::Connection(_)), "got {:?}", err);
    assert!(matches!(
        registry.discover(GreeterClient::INTERFACE_NAME).await,
        Err(_)
    ));
}

#[tokio::test]
async fn test_client_shutdown() {
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let provider = start_provider("a", registry.clone()).await;
    let rpc = ClientBuilder::from_static(provider.address.clone())
        .build()
        .unwrap();
    let greeter = GreeterClient::new(rpc.clone());
    assert_eq!(greeter.greet("x".to_string()).await.unwrap(), "Hello, x!");

    rpc.shutdown().await;
    rpc.shutdown().await;
    assert!(matches!(
        greeter.greet("x".to_string()).await,
        Err(RpcError::Connection(_))
    ));
}

#[test]
fn test_blocking_client_from_many_threads() {
    let server_runtime = tokio::runtime::Runtime::new().unwrap();
    let registry: BoxRegistry = Arc::new(MemoryRegistry::new());
    let provider = server_runtime.block_on(start_provider("a", registry));

    let client = BlockingClient::new(ClientBuilder::from_static(provider.address.clone())).unwrap();
    std::thread::scope(|scope| {
        for i in 0..4 {
            let client = &client;
            scope.spawn(move || {
                let value = client
                    .invoke(
                        "org.demo.Greeter",
                        "greet",
                        vec!["String".to_string()],
                        vec![json!(format!("thread-{}", i))],
                    )
                    .unwrap();
                assert_eq!(value, json!(format!("Hello, thread-{}!", i)));
            });
        }
    });

    let greeter = GreeterClient::new(client.client().clone());
    assert_eq!(client.block_on(greeter.divide(8, 2)).unwrap(), 4);
    assert_eq!(client.client().connect_count(), 1);
    client.shutdown();

    server_runtime.block_on(provider.server.stop());
}
