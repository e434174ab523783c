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

use bytes::{BufMut, Bytes, BytesMut};
use protocol_base::{RequestId, HEARTBEAT_REQUEST_ID};

use crate::error::RemotingError;

pub const MAGIC: [u8; 4] = *b"rpc!";
pub const PROTOCOL_VERSION: u8 = 1;

/// magic(4) + version(1) + serialization(1) + type(1) + request id(4) + body length(4)
pub const HEADER_LENGTH: usize = 15;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Request = 1,
    Response = 2,
    Ping = 3,
    Pong = 4,
}

impl MessageType {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, MessageType::Ping | MessageType::Pong)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Request),
            2 => Ok(MessageType::Response),
            3 => Ok(MessageType::Ping),
            4 => Ok(MessageType::Pong),
            other => Err(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}

/// One unit on the wire. The body is opaque here; see `serialize` for its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u8,
    pub serialization_id: u8,
    pub message_type: MessageType,
    pub request_id: RequestId,
    pub body: Bytes,
}

impl Frame {
    pub fn new(
        serialization_id: u8,
        message_type: MessageType,
        request_id: RequestId,
        body: Bytes,
    ) -> Self {
        Frame {
            version: PROTOCOL_VERSION,
            serialization_id,
            message_type,
            request_id,
            body,
        }
    }

    pub fn ping(serialization_id: u8) -> Self {
        Frame::new(
            serialization_id,
            MessageType::Ping,
            HEARTBEAT_REQUEST_ID,
            Bytes::new(),
        )
    }

    pub fn pong(serialization_id: u8) -> Self {
        Frame::new(
            serialization_id,
            MessageType::Pong,
            HEARTBEAT_REQUEST_ID,
            Bytes::new(),
        )
    }

    pub fn is_heartbeat(&self) -> bool {
        self.message_type.is_heartbeat()
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LENGTH + self.body.len()
    }

    /// Appends the encoded frame. Nothing is written when the body does not
    /// fit the i32 length field.
    pub fn write_to(&self, dst: &mut BytesMut) -> Result<(), RemotingError> {
        let body_length = body_length(self.body.len())?;
        dst.reserve(self.encoded_len());
        dst.put_slice(&MAGIC);
        dst.put_u8(self.version);
        dst.put_u8(self.serialization_id);
        dst.put_u8(self.message_type.into());
        dst.put_i32(self.request_id);
        dst.put_i32(body_length);
        dst.put_slice(&self.body);
        Ok(())
    }
}

fn body_length(len: usize) -> Result<i32, RemotingError> {
    i32::try_from(len).map_err(|_| {
        RemotingError::Protocol(format!("body length {} does not fit the frame header", len))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let frame = Frame::new(1, MessageType::Request, 0x0102_0304, Bytes::from_static(b"ab"));
        let mut buf = BytesMut::new();
        frame.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_LENGTH + 2);
        assert_eq!(&buf[..4], b"rpc!");
        assert_eq!(buf[4], PROTOCOL_VERSION);
        assert_eq!(buf[5], 1);
        assert_eq!(buf[6], 1);
        assert_eq!(&buf[7..11], &[1, 2, 3, 4]);
        assert_eq!(&buf[11..15], &[0, 0, 0, 2]);
        assert_eq!(&buf[15..], b"ab");
    }

    #[test]
    fn test_body_length_limit() {
        assert_eq!(body_length(0).unwrap(), 0);
        assert_eq!(body_length(i32::MAX as usize).unwrap(), i32::MAX);
        assert!(matches!(
            body_length(i32::MAX as usize + 1),
            Err(RemotingError::Protocol(_))
        ));
    }

    #[test]
    fn test_message_type_from_byte() {
        assert_eq!(MessageType::try_from(3), Ok(MessageType::Ping));
        assert_eq!(MessageType::try_from(9), Err(9));
        assert!(MessageType::Pong.is_heartbeat());
        assert!(!MessageType::Response.is_heartbeat());
    }
}
