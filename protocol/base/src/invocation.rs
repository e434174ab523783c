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

use crate::RequestId;

/// One remote method invocation, built by the consumer and executed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub request_id: RequestId,
    pub interface_name: String,
    pub method_name: String,
    pub parameter_types: Vec<String>,
    pub parameters: Vec<Value>,
}

impl CallRequest {
    pub fn new(interface_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        CallRequest {
            request_id: 0,
            interface_name: interface_name.into(),
            method_name: method_name.into(),
            parameter_types: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_request_id(self, request_id: RequestId) -> Self {
        Self { request_id, ..self }
    }

    pub fn with_parameter_types(self, parameter_types: Vec<String>) -> Self {
        Self {
            parameter_types,
            ..self
        }
    }

    pub fn with_parameters(self, parameters: Vec<Value>) -> Self {
        Self { parameters, ..self }
    }

    pub fn get_interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn get_method_name(&self) -> &str {
        &self.method_name
    }

    /// "interface#method(type, ..)" for log lines
    pub fn signature(&self) -> String {
        format!(
            "{}#{}({})",
            self.interface_name,
            self.method_name,
            self.parameter_types.join(", ")
        )
    }
}
