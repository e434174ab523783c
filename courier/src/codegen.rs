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

//! Support code referenced by `#[rpc_trait]` and `#[rpc_server]` expansions.

pub use serde_json::{self, Value};
pub use std::sync::Arc;

pub use protocol_base::RemoteError;

pub use crate::{
    client::RpcClient,
    error::RpcError,
    server::service::{MethodDescriptor, RpcService, ServiceError},
};

use serde::{de::DeserializeOwned, Serialize};

pub fn to_parameter<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| RpcError::Serialization(err.to_string()))
}

pub fn from_result<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|err| RpcError::Serialization(err.to_string()))
}

/// Splits the parameter list of `method`, which takes exactly `N` arguments.
pub fn take_parameters<const N: usize>(
    method: &str,
    parameters: Vec<Value>,
) -> Result<[Value; N], RemoteError> {
    let count = parameters.len();
    parameters.try_into().map_err(|_| {
        RemoteError::invalid_argument(format!(
            "{} takes {} parameters, got {}",
            method, N, count
        ))
    })
}

pub fn from_parameter<T: DeserializeOwned>(
    method: &str,
    index: usize,
    value: Value,
) -> Result<T, RemoteError> {
    serde_json::from_value(value).map_err(|err| {
        RemoteError::invalid_argument(format!(
            "parameter {} of {}: {}",
            index, method, err
        ))
    })
}

pub fn into_response<T: Serialize>(result: Result<T, ServiceError>) -> Result<Value, RemoteError> {
    let value = result?;
    serde_json::to_value(value)
        .map_err(|err| RemoteError::invocation(format!("failed to serialize result: {}", err)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_take_parameters() {
        let [a, b] = take_parameters::<2>("add", vec![json!(1), json!(2)]).unwrap();
        assert_eq!((a, b), (json!(1), json!(2)));

        let err = take_parameters::<2>("add", vec![json!(1)]).unwrap_err();
        assert_eq!(err.message, "add takes 2 parameters, got 1");
    }

    #[test]
    fn test_from_parameter_type_mismatch() {
        let err = from_parameter::<u32>("add", 0, json!("one")).unwrap_err();
        assert_eq!(err.kind, protocol_base::RemoteErrorKind::InvalidArgument);
    }

    #[test]
    fn test_into_response() {
        assert_eq!(into_response(Ok(vec![1, 2])).unwrap(), json!([1, 2]));
        let err = into_response::<()>(Err(ServiceError::new("nope"))).unwrap_err();
        assert_eq!(err.message, "nope");
    }
}
