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
use std::net::IpAddr;

// get local ip for linux/macos/windows
pub fn local_ip() -> Option<IpAddr> {
    local_ip_address::local_ip().ok()
}

// hosts that cannot be dialed by a remote consumer
pub fn is_unspecified_host(host: &str) -> bool {
    let host = host.trim();
    host.is_empty() || host == "0.0.0.0" || host == "::"
}
