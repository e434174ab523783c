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

use courier_base::constants::RANDOM_KEY;
use courier_logger::tracing::debug;
use rand::prelude::SliceRandom;

use super::LoadBalance;

#[derive(Debug, Clone, Default)]
pub struct RandomLoadBalance {}

impl LoadBalance for RandomLoadBalance {
    fn name(&self) -> &'static str {
        RANDOM_KEY
    }

    fn select<'a>(&self, addresses: &'a [String]) -> Option<&'a str> {
        if addresses.len() == 1 {
            return addresses.first().map(String::as_str);
        }
        let selected = addresses.choose(&mut rand::thread_rng())?;
        debug!("random loadbalance picked {} of {:?}", selected, addresses);
        Some(selected.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select() {
        let lb = RandomLoadBalance::default();
        assert_eq!(lb.select(&[]), None);

        let single = vec!["10.0.0.1:9000".to_string()];
        assert_eq!(lb.select(&single), Some("10.0.0.1:9000"));

        let many = vec!["10.0.0.1:9000".to_string(), "10.0.0.2:9000".to_string()];
        for _ in 0..32 {
            let picked = lb.select(&many).unwrap();
            assert!(many.iter().any(|a| a == picked));
        }
    }
}
