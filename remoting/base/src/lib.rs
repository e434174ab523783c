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

pub mod codec;
pub mod error;
pub mod exchange;
pub mod frame;
pub mod heartbeat;
pub mod serialize;

pub use codec::{decode_message, encode_message, FrameCodec};
pub use error::RemotingError;
pub use exchange::{
    client::ConnectionManager,
    connection::{ConnectOptions, Connection},
    correlator::{next_request_id, PendingCall, RequestCorrelator, RequestIdGenerator},
    server::{serve_connection, ExchangeHandler, ServeOptions},
    Message,
};
pub use frame::{Frame, MessageType};
pub use serialize::{
    BoxedSerialization, JsonSerialization, MsgPackSerialization, Serialization,
    SerializationRegistry,
};
