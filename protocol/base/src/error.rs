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
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// no service is published under the requested interface name
    ServiceNotFound,
    /// the interface has no method with that name and parameter types
    MethodNotFound,
    /// parameters could not be converted to the method's argument types
    InvalidArgument,
    /// the method itself failed
    Invocation,
}

impl Display for RemoteErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteErrorKind::ServiceNotFound => "service not found",
            RemoteErrorKind::MethodNotFound => "method not found",
            RemoteErrorKind::InvalidArgument => "invalid argument",
            RemoteErrorKind::Invocation => "invocation failed",
        };
        f.write_str(name)
    }
}

/// Error description carried inside a response; the call completed but the
/// callee could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        RemoteError {
            kind,
            message: message.into(),
        }
    }

    pub fn service_not_found(interface_name: &str) -> Self {
        Self::new(
            RemoteErrorKind::ServiceNotFound,
            format!("no service published for {}", interface_name),
        )
    }

    pub fn method_not_found(interface_name: &str, method_name: &str, types: &[String]) -> Self {
        Self::new(
            RemoteErrorKind::MethodNotFound,
            format!(
                "{} has no method {}({})",
                interface_name,
                method_name,
                types.join(", ")
            ),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidArgument, message)
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Invocation, message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::ServiceNotFound | RemoteErrorKind::MethodNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RemoteError::method_not_found("org.demo.Greeter", "greet", &["String".into()]);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "method not found: org.demo.Greeter has no method greet(String)"
        );
        assert!(!RemoteError::invocation("boom").is_not_found());
    }
}
