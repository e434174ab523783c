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

use std::{fmt::Debug, sync::Arc};

use courier_base::constants::{RANDOM_KEY, ROUND_ROBIN_KEY};

use self::{random::RandomLoadBalance, round_robin::RoundRobinLoadBalance};

pub mod random;
pub mod round_robin;

pub type BoxLoadBalance = Arc<dyn LoadBalance>;

/// Picks one provider address out of the candidates of a call.
pub trait LoadBalance: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn select<'a>(&self, addresses: &'a [String]) -> Option<&'a str>;
}

pub fn from_name(name: &str) -> Option<BoxLoadBalance> {
    match name {
        RANDOM_KEY => Some(Arc::new(RandomLoadBalance::default())),
        ROUND_ROBIN_KEY | "roundrobin" => Some(Arc::new(RoundRobinLoadBalance::default())),
        _ => None,
    }
}
