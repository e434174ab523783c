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

#[cfg(test)]
mod tests_load {
    use anyhow::Error;
    use std::{env, fs, path::PathBuf, sync::Once, time::Duration};

    use courier_config::{get_root_config, set_config_file_path, ConfigError, RootConfig};

    static INIT: Once = Once::new();

    fn setup() {
        INIT.call_once(|| {
            set_config_file_path(format!("{}/{}", env!("CARGO_MANIFEST_DIR"), "tests"));
        });
    }

    #[test]
    fn test_load_from_file() -> Result<(), Error> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("courier.yaml");
        let config = RootConfig::load_from(&path)?;
        assert_eq!(config.registry.protocol, "zookeeper");
        assert_eq!(config.registry.address, "10.0.0.9:2181");
        assert_eq!(config.registry.session_timeout(), Duration::from_secs(3));
        assert_eq!(config.provider.advertise_address().to_string(), "10.0.0.1:9000");
        assert_eq!(config.consumer.call_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.consumer.load_balance, "round_robin");
        assert_eq!(config.protocol.serialization, "msgpack");
        assert_eq!(config.protocol.heartbeat.ping_interval(), Duration::from_secs(10));
        assert_eq!(config.protocol.heartbeat.idle_timeout(), Duration::from_secs(25));
        Ok(())
    }

    #[test]
    fn test_default_value() -> Result<(), Error> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("courier.yaml");
        let config = RootConfig::load_from(&path)?;
        // not present in the file
        assert_eq!(config.consumer.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.registry.root_path, "/rpc");
        assert_eq!(config.protocol.max_frame_length, 8 * 1024 * 1024);
        Ok(())
    }

    #[test]
    fn test_global_config_from_env_path() -> Result<(), Error> {
        setup();
        assert!(env::var("COURIER_CONFIG_PATH").is_ok());
        let config = get_root_config()?;
        assert_eq!(config.provider.port, 9000);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = RootConfig::load_from(&PathBuf::from("/does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let path = env::temp_dir().join(format!("courier-malformed-{}.yaml", std::process::id()));
        fs::write(&path, "courier: [not, a, map").unwrap();
        let err = RootConfig::load_from(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
