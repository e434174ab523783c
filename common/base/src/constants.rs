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

pub const DEFAULT_PROVIDER_HOST: &str = "127.0.0.1";

pub const DEFAULT_PROVIDER_PORT: u16 = 8080;

pub const DEFAULT_REGISTRY_ADDRESS: &str = "127.0.0.1:2181";

pub const DEFAULT_REGISTRY_ROOT: &str = "/rpc";

pub const ZOOKEEPER_KEY: &str = "zookeeper";

pub const MEMORY_KEY: &str = "memory";

pub const STATIC_KEY: &str = "static";

pub const RANDOM_KEY: &str = "random";

pub const ROUND_ROBIN_KEY: &str = "round_robin";

pub const JSON_KEY: &str = "json";

pub const MSGPACK_KEY: &str = "msgpack";

pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 6000;

pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;
