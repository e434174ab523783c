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
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config has no `{0}` section")]
    MissingSection(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn from_load(path: &Path, err: anyhow::Error) -> Self {
        let err = match err.downcast::<io::Error>() {
            Ok(source) => {
                return ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
            Err(err) => err,
        };
        match err.downcast::<serde_yaml::Error>() {
            Ok(source) => ConfigError::Parse(source),
            // not a regular file
            Err(err) => ConfigError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, err.to_string()),
            },
        }
    }
}
