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

use bytes::{Buf, BytesMut};
use courier_base::constants::DEFAULT_MAX_FRAME_LENGTH;
use courier_logger::tracing;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::RemotingError,
    exchange::Message,
    frame::{Frame, MessageType, HEADER_LENGTH, MAGIC, PROTOCOL_VERSION},
    serialize::Serialization,
};

/// Length-prefixed frame codec. Decoding only depends on the bytes received,
/// never on how they were split across reads.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_length: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl FrameCodec {
    pub fn new(max_frame_length: usize) -> Self {
        FrameCodec { max_frame_length }
    }

    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = RemotingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < HEADER_LENGTH {
                src.reserve(HEADER_LENGTH - src.len());
                return Ok(None);
            }

            if src[..4] != MAGIC {
                return Err(RemotingError::Protocol(format!(
                    "bad magic {:02x?}",
                    &src[..4]
                )));
            }
            let version = src[4];
            if version != PROTOCOL_VERSION {
                return Err(RemotingError::Protocol(format!(
                    "unsupported protocol version {}",
                    version
                )));
            }
            let serialization_id = src[5];
            let type_byte = src[6];
            let mut numbers = &src[7..HEADER_LENGTH];
            let request_id = numbers.get_i32();
            let body_length = numbers.get_i32();

            if body_length < 0 {
                return Err(RemotingError::Protocol(format!(
                    "negative body length {}",
                    body_length
                )));
            }
            let body_length = body_length as usize;
            if body_length > self.max_frame_length {
                return Err(RemotingError::Protocol(format!(
                    "body length {} exceeds the limit of {} bytes",
                    body_length, self.max_frame_length
                )));
            }

            let frame_length = HEADER_LENGTH + body_length;
            if src.len() < frame_length {
                src.reserve(frame_length - src.len());
                return Ok(None);
            }

            src.advance(HEADER_LENGTH);
            let body = src.split_to(body_length).freeze();

            match MessageType::try_from(type_byte) {
                Ok(message_type) => {
                    return Ok(Some(Frame {
                        version,
                        serialization_id,
                        message_type,
                        request_id,
                        body,
                    }))
                }
                Err(unknown) => {
                    tracing::warn!(
                        "dropping frame with unknown message type {}, request id {}",
                        unknown,
                        request_id
                    );
                }
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = RemotingError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body.len() > self.max_frame_length {
            return Err(RemotingError::Protocol(format!(
                "body length {} exceeds the limit of {} bytes",
                item.body.len(),
                self.max_frame_length
            )));
        }
        item.write_to(dst)
    }
}

pub fn encode_message(
    message: &Message,
    serialization: &dyn Serialization,
) -> Result<Frame, RemotingError> {
    let serialization_id = serialization.id();
    match message {
        Message::Ping => Ok(Frame::ping(serialization_id)),
        Message::Pong => Ok(Frame::pong(serialization_id)),
        _ => {
            let body = serialization.serialize(message)?;
            Ok(Frame::new(
                serialization_id,
                message.message_type(),
                message.request_id(),
                body,
            ))
        }
    }
}

pub fn decode_message(
    frame: Frame,
    serialization: &dyn Serialization,
) -> Result<Message, RemotingError> {
    match frame.message_type {
        MessageType::Ping => Ok(Message::Ping),
        MessageType::Pong => Ok(Message::Pong),
        message_type => {
            if frame.serialization_id != serialization.id() {
                return Err(RemotingError::Serialization(format!(
                    "frame uses serialization id {}, connection uses {} ({})",
                    frame.serialization_id,
                    serialization.id(),
                    serialization.name()
                )));
            }
            let message = serialization.deserialize(&frame.body, message_type)?;
            if message.request_id() != frame.request_id {
                return Err(RemotingError::Serialization(format!(
                    "header request id {} does not match body request id {}",
                    frame.request_id,
                    message.request_id()
                )));
            }
            Ok(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes};
    use protocol_base::{CallRequest, CallResponse, RemoteError};
    use serde_json::json;

    use super::*;
    use crate::serialize::{JsonSerialization, MsgPackSerialization};

    fn encode_frame(frame: Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        FrameCodec::default().encode(frame, &mut buf).unwrap();
        buf
    }

    fn sample_request() -> Message {
        Message::Request(
            CallRequest::new("org.demo.Greeter", "greet")
                .with_request_id(42)
                .with_parameter_types(vec!["String".to_string()])
                .with_parameters(vec![json!("courier")]),
        )
    }

    #[test]
    fn test_request_survives_encoding() {
        for serialization in [
            &JsonSerialization as &dyn Serialization,
            &MsgPackSerialization as &dyn Serialization,
        ] {
            let message = sample_request();
            let frame = encode_message(&message, serialization).unwrap();
            assert_eq!(frame.request_id, 42);
            assert_eq!(frame.serialization_id, serialization.id());

            let mut buf = encode_frame(frame);
            let decoded = FrameCodec::default().decode(&mut buf).unwrap().unwrap();
            assert!(buf.is_empty());
            assert_eq!(decode_message(decoded, serialization).unwrap(), message);
        }
    }

    #[test]
    fn test_error_response_survives_encoding() {
        let message = Message::Response(CallResponse::error(
            5,
            RemoteError::service_not_found("org.demo.Missing"),
        ));
        let frame = encode_message(&message, &MsgPackSerialization).unwrap();
        let mut buf = encode_frame(frame);
        let decoded = FrameCodec::default().decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            decode_message(decoded, &MsgPackSerialization).unwrap(),
            message
        );
    }

    #[test]
    fn test_decode_independent_of_chunking() {
        let first = encode_message(&sample_request(), &JsonSerialization).unwrap();
        let second = encode_message(
            &Message::Response(CallResponse::ok(42, json!({"greeting": "hi"}))),
            &JsonSerialization,
        )
        .unwrap();
        let mut wire = encode_frame(first.clone());
        wire.extend_from_slice(&encode_frame(Frame::ping(1)));
        wire.extend_from_slice(&encode_frame(second.clone()));
        let wire = wire.freeze();

        for chunk_size in [1, 2, 7, 15, 16, 64, wire.len()] {
            let mut codec = FrameCodec::default();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();
            for chunk in wire.chunks(chunk_size) {
                buf.extend_from_slice(chunk);
                while let Some(frame) = codec.decode(&mut buf).unwrap() {
                    frames.push(frame);
                }
            }
            assert_eq!(frames, vec![first.clone(), Frame::ping(1), second.clone()]);
        }
    }

    #[test]
    fn test_incomplete_header_waits() {
        let mut buf = BytesMut::from(&b"rpc!\x01"[..]);
        assert!(FrameCodec::default().decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_bad_magic_is_protocol_error() {
        let mut buf = encode_frame(Frame::ping(1));
        buf[0] = b'x';
        let err = FrameCodec::default().decode(&mut buf).unwrap_err();
        assert!(matches!(err, RemotingError::Protocol(_)));
    }

    #[test]
    fn test_bad_version_is_protocol_error() {
        let mut buf = encode_frame(Frame::ping(1));
        buf[4] = 9;
        let err = FrameCodec::default().decode(&mut buf).unwrap_err();
        assert!(matches!(err, RemotingError::Protocol(_)));
    }

    #[test]
    fn test_negative_length_is_protocol_error() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(1);
        buf.put_u8(1);
        buf.put_i32(3);
        buf.put_i32(-1);
        let err = FrameCodec::default().decode(&mut buf).unwrap_err();
        assert!(matches!(err, RemotingError::Protocol(_)));
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let frame = Frame::new(1, MessageType::Request, 1, Bytes::from(vec![0u8; 64]));
        let mut buf = BytesMut::new();
        frame.write_to(&mut buf).unwrap();

        let mut codec = FrameCodec::new(32);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(RemotingError::Protocol(_))
        ));
        assert!(matches!(
            codec.encode(frame, &mut BytesMut::new()),
            Err(RemotingError::Protocol(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(1);
        buf.put_u8(77);
        buf.put_i32(9);
        buf.put_i32(3);
        buf.put_slice(b"???");
        buf.extend_from_slice(&encode_frame(Frame::pong(1)));

        let mut codec = FrameCodec::default();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::pong(1)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_heartbeat_frames_have_empty_body() {
        let frame = encode_message(&Message::Ping, &MsgPackSerialization).unwrap();
        assert!(frame.body.is_empty());
        assert_eq!(frame.request_id, 0);
        assert_eq!(decode_message(frame, &JsonSerialization).unwrap(), Message::Ping);
    }

    #[test]
    fn test_serialization_mismatch() {
        let frame = encode_message(&sample_request(), &JsonSerialization).unwrap();
        let err = decode_message(frame, &MsgPackSerialization).unwrap_err();
        assert!(matches!(err, RemotingError::Serialization(_)));
    }
}
