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

use std::sync::atomic::{AtomicUsize, Ordering};

use courier_base::constants::ROUND_ROBIN_KEY;

use super::LoadBalance;

#[derive(Debug, Default)]
pub struct RoundRobinLoadBalance {
    next: AtomicUsize,
}

impl LoadBalance for RoundRobinLoadBalance {
    fn name(&self) -> &'static str {
        ROUND_ROBIN_KEY
    }

    fn select<'a>(&self, addresses: &'a [String]) -> Option<&'a str> {
        if addresses.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % addresses.len();
        addresses.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_in_turn() {
        let lb = RoundRobinLoadBalance::default();
        let addresses = vec![
            "a:1".to_string(),
            "b:1".to_string(),
            "c:1".to_string(),
        ];
        let picked: Vec<&str> = (0..6).filter_map(|_| lb.select(&addresses)).collect();
        assert_eq!(picked, vec!["a:1", "b:1", "c:1", "a:1", "b:1", "c:1"]);
        assert_eq!(lb.select(&[]), None);
    }
}
