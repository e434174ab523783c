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

use std::time::Duration;

use protocol_base::{RemoteError, RequestId};
use remoting_base::RemotingError;
use thiserror::Error;

use crate::registry::RegistryError;

/// Everything a caller can get back instead of a value.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("discovery error: {0}")]
    Discovery(String),
    #[error("call {request_id} timed out after {timeout:?}")]
    Timeout {
        request_id: RequestId,
        timeout: Duration,
    },
    #[error("remote invocation failed: {0}")]
    RemoteInvocation(RemoteError),
    #[error("{0}")]
    NotFound(RemoteError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RpcError {
    /// The callee's error, if the call reached it.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            RpcError::RemoteInvocation(err) | RpcError::NotFound(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RemotingError> for RpcError {
    fn from(err: RemotingError) -> Self {
        match err {
            RemotingError::Connection(msg) => RpcError::Connection(msg),
            RemotingError::Protocol(msg) => RpcError::Protocol(msg),
            RemotingError::Serialization(msg) => RpcError::Serialization(msg),
            RemotingError::Timeout {
                request_id,
                timeout,
            } => RpcError::Timeout {
                request_id,
                timeout,
            },
            RemotingError::DuplicateRequestId(id) => {
                RpcError::Protocol(format!("request id {} is already outstanding", id))
            }
            RemotingError::Io(err) => RpcError::Io(err),
        }
    }
}

impl From<RegistryError> for RpcError {
    fn from(err: RegistryError) -> Self {
        RpcError::Discovery(err.to_string())
    }
}

impl From<RemoteError> for RpcError {
    fn from(err: RemoteError) -> Self {
        if err.is_not_found() {
            RpcError::NotFound(err)
        } else {
            RpcError::RemoteInvocation(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_mapping() {
        let err = RpcError::from(RemoteError::service_not_found("org.demo.Missing"));
        assert!(matches!(err, RpcError::NotFound(_)));

        let err = RpcError::from(RemoteError::invocation("division by zero"));
        assert!(matches!(err, RpcError::RemoteInvocation(_)));
        assert_eq!(err.remote_error().unwrap().message, "division by zero");
    }

    #[test]
    fn test_remoting_error_mapping() {
        let err = RpcError::from(RemotingError::Timeout {
            request_id: 3,
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(err, RpcError::Timeout { request_id: 3, .. }));
        assert!(matches!(
            RpcError::from(RemotingError::Connection("reset".into())),
            RpcError::Connection(_)
        ));
    }
}
