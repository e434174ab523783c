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
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::RemoteError, RequestId};

/// Outcome of a [crate::CallRequest]: either the returned value or the failure,
/// never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub request_id: RequestId,
    pub result: Result<Value, RemoteError>,
}

impl CallResponse {
    pub fn ok(request_id: RequestId, value: Value) -> Self {
        CallResponse {
            request_id,
            result: Ok(value),
        }
    }

    pub fn error(request_id: RequestId, error: RemoteError) -> Self {
        CallResponse {
            request_id,
            result: Err(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    pub fn into_result(self) -> Result<Value, RemoteError> {
        self.result
    }
}
