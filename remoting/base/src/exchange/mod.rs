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

use protocol_base::{CallRequest, CallResponse, RequestId, HEARTBEAT_REQUEST_ID};

use crate::frame::MessageType;

pub mod client;
pub mod connection;
pub mod correlator;
pub mod server;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(CallRequest),
    Response(CallResponse),
    Ping,
    Pong,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Request(_) => MessageType::Request,
            Message::Response(_) => MessageType::Response,
            Message::Ping => MessageType::Ping,
            Message::Pong => MessageType::Pong,
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            Message::Request(request) => request.request_id,
            Message::Response(response) => response.request_id,
            Message::Ping | Message::Pong => HEARTBEAT_REQUEST_ID,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Message::Ping | Message::Pong)
    }
}
