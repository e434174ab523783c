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

use protocol_base::RequestId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemotingError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("request {request_id} timed out after {timeout:?}")]
    Timeout {
        request_id: RequestId,
        timeout: Duration,
    },
    #[error("request id {0} is already outstanding on this connection")]
    DuplicateRequestId(RequestId),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RemotingError {
    pub fn is_connection(&self) -> bool {
        matches!(self, RemotingError::Connection(_) | RemotingError::Io(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RemotingError::Timeout { .. })
    }
}
