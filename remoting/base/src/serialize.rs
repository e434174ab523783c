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

use std::{fmt::Debug, sync::Arc};

use bytes::Bytes;
use courier_base::constants::{JSON_KEY, MSGPACK_KEY};
use dashmap::DashMap;
use protocol_base::{CallRequest, CallResponse};
use serde::{de::DeserializeOwned, Serialize};

use crate::{error::RemotingError, exchange::Message, frame::MessageType};

pub const JSON_SERIALIZATION_ID: u8 = 1;
pub const MSGPACK_SERIALIZATION_ID: u8 = 2;

/// Turns request and response messages into frame bodies. Heartbeats carry no body.
pub trait Serialization: Debug + Send + Sync + 'static {
    fn id(&self) -> u8;

    fn name(&self) -> &'static str;

    fn serialize(&self, message: &Message) -> Result<Bytes, RemotingError>;

    fn deserialize(
        &self,
        body: &[u8],
        message_type: MessageType,
    ) -> Result<Message, RemotingError>;
}

pub type BoxedSerialization = Arc<dyn Serialization>;

fn serialize_with<E>(
    message: &Message,
    encode: impl Fn(&dyn ErasedBody) -> Result<Vec<u8>, E>,
) -> Result<Bytes, RemotingError>
where
    E: std::fmt::Display,
{
    let body: &dyn ErasedBody = match message {
        Message::Request(request) => request,
        Message::Response(response) => response,
        Message::Ping | Message::Pong => return Ok(Bytes::new()),
    };
    encode(body)
        .map(Bytes::from)
        .map_err(|err| RemotingError::Serialization(err.to_string()))
}

fn deserialize_with<E>(
    message_type: MessageType,
    request: impl FnOnce() -> Result<CallRequest, E>,
    response: impl FnOnce() -> Result<CallResponse, E>,
) -> Result<Message, RemotingError>
where
    E: std::fmt::Display,
{
    let message = match message_type {
        MessageType::Request => request().map(Message::Request),
        MessageType::Response => response().map(Message::Response),
        MessageType::Ping => return Ok(Message::Ping),
        MessageType::Pong => return Ok(Message::Pong),
    };
    message.map_err(|err| RemotingError::Serialization(err.to_string()))
}

/// Bodies that both serializers can write.
trait ErasedBody {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
    fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error>;
}

impl<T: Serialize> ErasedBody for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}

fn from_msgpack<T: DeserializeOwned>(body: &[u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(body)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerialization;

impl Serialization for JsonSerialization {
    fn id(&self) -> u8 {
        JSON_SERIALIZATION_ID
    }

    fn name(&self) -> &'static str {
        JSON_KEY
    }

    fn serialize(&self, message: &Message) -> Result<Bytes, RemotingError> {
        serialize_with(message, |body| body.to_json())
    }

    fn deserialize(
        &self,
        body: &[u8],
        message_type: MessageType,
    ) -> Result<Message, RemotingError> {
        deserialize_with(
            message_type,
            || serde_json::from_slice(body),
            || serde_json::from_slice(body),
        )
    }
}

/// MessagePack with named struct fields, so bodies stay self-describing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackSerialization;

impl Serialization for MsgPackSerialization {
    fn id(&self) -> u8 {
        MSGPACK_SERIALIZATION_ID
    }

    fn name(&self) -> &'static str {
        MSGPACK_KEY
    }

    fn serialize(&self, message: &Message) -> Result<Bytes, RemotingError> {
        serialize_with(message, |body| body.to_msgpack())
    }

    fn deserialize(
        &self,
        body: &[u8],
        message_type: MessageType,
    ) -> Result<Message, RemotingError> {
        deserialize_with(
            message_type,
            || from_msgpack(body),
            || from_msgpack(body),
        )
    }
}

pub struct SerializationRegistry {
    registry: DashMap<&'static str, BoxedSerialization>,
}

impl Default for SerializationRegistry {
    fn default() -> Self {
        let registry = SerializationRegistry {
            registry: DashMap::new(),
        };
        registry
            .registry
            .insert(JSON_KEY, Arc::new(JsonSerialization));
        registry
            .registry
            .insert(MSGPACK_KEY, Arc::new(MsgPackSerialization));
        registry
    }
}

impl SerializationRegistry {
    pub fn get_serialization(&self, name: &str) -> Option<BoxedSerialization> {
        self.registry.get(name).map(|entry| entry.value().clone())
    }

    pub fn get_by_id(&self, id: u8) -> Option<BoxedSerialization> {
        self.registry
            .iter()
            .find(|entry| entry.value().id() == id)
            .map(|entry| entry.value().clone())
    }

    pub fn set_serialization(
        &self,
        serialization: BoxedSerialization,
    ) -> Result<(), RemotingError> {
        let name = serialization.name();
        if self.registry.contains_key(name) || self.get_by_id(serialization.id()).is_some() {
            return Err(RemotingError::Serialization(format!(
                "serialization {} (id {}) is already registered",
                name,
                serialization.id()
            )));
        }
        self.registry.insert(name, serialization);
        Ok(())
    }
}
