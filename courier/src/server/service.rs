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

use std::fmt::{Debug, Display, Formatter};

use protocol_base::RemoteError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameter_types: Vec<String>,
}

impl MethodDescriptor {
    pub fn new(name: &str, parameter_types: &[&str]) -> Self {
        MethodDescriptor {
            name: name.to_string(),
            parameter_types: parameter_types.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn matches(&self, name: &str, parameter_types: &[String]) -> bool {
        self.name == name && self.parameter_types == parameter_types
    }
}

/// A service implementation callable by name. `#[rpc_server]` implements it
/// for a type implementing an `#[rpc_trait]` interface.
///
/// `invoke` runs on the blocking worker pool and may block.
pub trait RpcService: Send + Sync + 'static {
    fn interface_name(&self) -> &str;

    fn methods(&self) -> Vec<MethodDescriptor>;

    fn invoke(&self, method: &str, parameters: Vec<Value>) -> Result<Value, RemoteError>;
}

/// Failure returned by a service method; reaches the caller as a remote
/// invocation error carrying this message.
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        ServiceError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Debug for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceError").field(&self.message).finish()
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E> From<E> for ServiceError
where
    E: std::error::Error,
{
    fn from(err: E) -> Self {
        ServiceError::new(err.to_string())
    }
}

impl From<ServiceError> for RemoteError {
    fn from(err: ServiceError) -> Self {
        RemoteError::invocation(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<i32, ServiceError> {
        Ok(input.parse::<i32>()?)
    }

    #[test]
    fn test_error_conversion() {
        let err = parse("x").unwrap_err();
        assert_eq!(err.message(), "invalid digit found in string");
        let remote = RemoteError::from(err);
        assert!(!remote.is_not_found());
    }

    #[test]
    fn test_descriptor_matching() {
        let descriptor = MethodDescriptor::new("greet", &["String"]);
        assert!(descriptor.matches("greet", &["String".to_string()]));
        assert!(!descriptor.matches("greet", &[]));
        assert!(!descriptor.matches("hello", &["String".to_string()]));
    }
}
