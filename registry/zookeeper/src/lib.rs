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

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use courier::registry::{
    self, BoxRegistry, Registry, RegistryError, RegistryNotifyListener, ServiceEvent,
};
use courier_base::constants::ZOOKEEPER_KEY;
use courier_config::RegistryConfig;
use courier_logger::tracing::{debug, error, info, warn};
use zookeeper::{
    Acl, CreateMode, WatchedEvent, WatchedEventType, Watcher, ZkError, ZkResult, ZooKeeper,
};

struct LoggingWatcher;
impl Watcher for LoggingWatcher {
    fn handle(&self, e: WatchedEvent) {
        debug!("zookeeper session event: {:?}", e)
    }
}

/// Registry backed by ZooKeeper.
///
/// Each provider is an ephemeral node `<root>/<service>/<urlencoded host:port>`
/// under a persistent service node, so a provider whose session dies disappears
/// from discovery on its own.
pub struct ZookeeperRegistry {
    root_path: String,
    zk_client: Arc<ZooKeeper>,
    closed: Arc<AtomicBool>,
}

impl ZookeeperRegistry {
    /// Connects to the ensemble. Blocks until the session is established.
    pub fn new(
        connect_string: &str,
        root_path: &str,
        session_timeout: Duration,
    ) -> Result<ZookeeperRegistry, RegistryError> {
        let zk_client = ZooKeeper::connect(connect_string, session_timeout, LoggingWatcher)
            .map_err(|err| {
                RegistryError::Registration(format!(
                    "failed to connect to zookeeper {}: {}",
                    connect_string, err
                ))
            })?;
        info!("zk server connect string: {}", connect_string);
        Ok(ZookeeperRegistry {
            root_path: normalize_root(root_path),
            zk_client: Arc::new(zk_client),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<ZookeeperRegistry, RegistryError> {
        ZookeeperRegistry::new(
            &config.address,
            &config.root_path,
            config.session_timeout(),
        )
    }

    pub fn get_client(&self) -> Arc<ZooKeeper> {
        self.zk_client.clone()
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&ZooKeeper) -> ZkResult<T> + Send + 'static,
    {
        let zk_client = Arc::clone(&self.zk_client);
        match tokio::task::spawn_blocking(move || op(&zk_client)).await {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(err) => Err(format!("zookeeper task failed: {}", err)),
        }
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::Closed);
        }
        Ok(())
    }
}

/// Makes `zookeeper` available to [courier::registry::create_registry].
pub fn install() {
    registry::register_factory(ZOOKEEPER_KEY, |config| {
        Ok(Arc::new(ZookeeperRegistry::from_config(config)?) as BoxRegistry)
    });
}

#[async_trait]
impl Registry for ZookeeperRegistry {
    async fn register(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        self.ensure_open()?;
        let parent = service_path(&self.root_path, service);
        let node = provider_path(&self.root_path, service, address);
        debug!("register {} at {}", address, node);
        let data = address.as_bytes().to_vec();
        self.run_blocking(move |zk| {
            ensure_path(zk, &parent)?;
            // a node left behind by an earlier session of this provider
            delete_node(zk, &node)?;
            zk.create(&node, data, Acl::open_unsafe().clone(), CreateMode::Ephemeral)?;
            Ok(())
        })
        .await
        .map_err(RegistryError::Registration)
    }

    async fn unregister(&self, service: &str, address: &str) -> Result<(), RegistryError> {
        self.ensure_open()?;
        let node = provider_path(&self.root_path, service, address);
        debug!("unregister {}", node);
        self.run_blocking(move |zk| delete_node(zk, &node))
            .await
            .map_err(RegistryError::Registration)
    }

    async fn discover(&self, service: &str) -> Result<Vec<String>, RegistryError> {
        self.ensure_open()?;
        let path = service_path(&self.root_path, service);
        self.run_blocking(move |zk| match zk.get_children(&path, false) {
            Ok(children) => Ok(decode_addresses(children)),
            Err(ZkError::NoNode) => Ok(Vec::new()),
            Err(err) => Err(err),
        })
        .await
        .map_err(RegistryError::Discovery)
    }

    async fn subscribe(
        &self,
        service: &str,
        listener: RegistryNotifyListener,
    ) -> Result<(), RegistryError> {
        self.ensure_open()?;
        let watcher = ProvidersChangedWatcher {
            zk_client: Arc::clone(&self.zk_client),
            path: service_path(&self.root_path, service),
            service: service.to_string(),
            listener: Arc::clone(&listener),
            closed: Arc::clone(&self.closed),
        };
        let addresses = self
            .run_blocking(move |_| watcher.watch())
            .await
            .map_err(RegistryError::Discovery)?;
        info!("notifying {}->{:?}", service, addresses);
        listener.notify(ServiceEvent {
            key: service.to_string(),
            addresses,
        });
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.run_blocking(|zk| zk.close()).await {
            warn!("closing zookeeper session failed: {}", err);
        }
    }
}

/// Child watch on a service node. ZooKeeper watches fire once, so every
/// notification re-arms the watch before reporting the new provider list.
#[derive(Clone)]
struct ProvidersChangedWatcher {
    zk_client: Arc<ZooKeeper>,
    path: String,
    service: String,
    listener: RegistryNotifyListener,
    closed: Arc<AtomicBool>,
}

impl ProvidersChangedWatcher {
    // a child watch cannot be set on a missing node
    fn watch(&self) -> ZkResult<Vec<String>> {
        ensure_path(&self.zk_client, &self.path)?;
        let children = self.zk_client.get_children_w(&self.path, self.clone())?;
        Ok(decode_addresses(children))
    }
}

impl Watcher for ProvidersChangedWatcher {
    fn handle(&self, event: WatchedEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        match event.event_type {
            WatchedEventType::NodeChildrenChanged | WatchedEventType::NodeDeleted => {}
            other => {
                debug!("ignore {:?} on {}", other, self.path);
                return;
            }
        }
        match self.watch() {
            Ok(addresses) => {
                info!("notify {}->{:?}", self.service, addresses);
                self.listener.notify(ServiceEvent {
                    key: self.service.clone(),
                    addresses,
                });
            }
            Err(err) => error!("failed to re-watch {}: {}", self.path, err),
        }
    }
}

fn normalize_root(root_path: &str) -> String {
    let trimmed = root_path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn service_path(root_path: &str, service: &str) -> String {
    format!("{}/{}", root_path, service)
}

fn provider_path(root_path: &str, service: &str, address: &str) -> String {
    format!(
        "{}/{}",
        service_path(root_path, service),
        urlencoding::encode(address)
    )
}

fn decode_addresses(children: Vec<String>) -> Vec<String> {
    let mut addresses: Vec<String> = children
        .iter()
        .filter_map(|node_key| match urlencoding::decode(node_key) {
            Ok(address) => Some(address.into_owned()),
            Err(err) => {
                warn!("skip undecodable provider node {}: {}", node_key, err);
                None
            }
        })
        .collect();
    addresses.sort();
    addresses
}

// Creates every missing persistent node along `path`.
fn ensure_path(zk: &ZooKeeper, path: &str) -> ZkResult<()> {
    let mut current = String::new();
    for node_key in path.split('/').filter(|node_key| !node_key.is_empty()) {
        current.push('/');
        current.push_str(node_key);
        if zk.exists(&current, false)?.is_some() {
            continue;
        }
        match zk.create(
            &current,
            Vec::new(),
            Acl::open_unsafe().clone(),
            CreateMode::Persistent,
        ) {
            Ok(_) | Err(ZkError::NodeExists) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn delete_node(zk: &ZooKeeper, path: &str) -> ZkResult<()> {
    match zk.delete(path, None) {
        Ok(()) | Err(ZkError::NoNode) => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::{env, time::Duration};

    use courier::registry::{NotifyListener, Registry, ServiceEvent};
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_node_paths() {
        assert_eq!(normalize_root("/rpc/"), "/rpc");
        assert_eq!(normalize_root("rpc"), "/rpc");
        assert_eq!(normalize_root("/"), "");
        assert_eq!(service_path("/rpc", "org.demo.Greeter"), "/rpc/org.demo.Greeter");
        assert_eq!(
            provider_path("/rpc", "org.demo.Greeter", "10.0.0.1:9000"),
            "/rpc/org.demo.Greeter/10.0.0.1%3A9000"
        );
        assert_eq!(provider_path("", "svc", "h:1"), "/svc/h%3A1");
    }

    #[test]
    fn test_decode_addresses_sorted() {
        let children = vec![
            "10.0.0.2%3A9000".to_string(),
            "10.0.0.1%3A9000".to_string(),
            "%FF".to_string(),
        ];
        assert_eq!(
            decode_addresses(children),
            vec!["10.0.0.1:9000", "10.0.0.2:9000"]
        );
    }

    struct ChannelListener(mpsc::UnboundedSender<ServiceEvent>);

    impl NotifyListener for ChannelListener {
        fn notify(&self, event: ServiceEvent) {
            let _ = self.0.send(event);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "needs a running zookeeper, see ZOOKEEPER_SERVERS"]
    async fn test_register_discover_subscribe() {
        let servers = env::var("ZOOKEEPER_SERVERS").unwrap_or_else(|_| "localhost:2181".into());
        let registry =
            ZookeeperRegistry::new(&servers, "/courier-test", Duration::from_secs(6)).unwrap();
        let service = "org.demo.ZkGreeter";
        for address in registry.discover(service).await.unwrap() {
            registry.unregister(service, &address).await.unwrap();
        }

        registry.register(service, "10.0.0.1:9000").await.unwrap();
        assert_eq!(
            registry.discover(service).await.unwrap(),
            vec!["10.0.0.1:9000"]
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry
            .subscribe(service, Arc::new(ChannelListener(tx)))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().addresses, vec!["10.0.0.1:9000"]);

        registry.register(service, "10.0.0.2:9000").await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.addresses, vec!["10.0.0.1:9000", "10.0.0.2:9000"]);

        registry.unregister(service, "10.0.0.1:9000").await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.addresses, vec!["10.0.0.2:9000"]);

        registry.close().await;
        assert!(matches!(
            registry.discover(service).await,
            Err(RegistryError::Closed)
        ));
    }
}
