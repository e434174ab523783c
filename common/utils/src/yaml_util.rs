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
use std::{fs, path::PathBuf};

use anyhow::Error;
use serde_yaml::from_slice;

// parse yaml file to structs
pub fn yaml_file_parser<T>(path: PathBuf) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned + std::fmt::Debug,
{
    if !path.is_file() {
        return Err(anyhow::anyhow!("path is not a file: {:?}", path));
    }
    let data = fs::read(path.as_path())?;
    Ok(from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;
    use std::{collections::HashMap, path::PathBuf};

    use crate::yaml_util::yaml_file_parser;

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("application.yaml")
    }

    #[test]
    fn test_yaml_file_parser() {
        let config = yaml_file_parser::<HashMap<String, Value>>(fixture()).unwrap();
        assert!(config.contains_key("logging"));
        assert_eq!(config["courier"]["provider"]["port"].as_u64(), Some(8080));
    }

    #[test]
    fn test_missing_file() {
        assert!(yaml_file_parser::<HashMap<String, Value>>(PathBuf::from("/nope.yaml")).is_err());
    }
}
