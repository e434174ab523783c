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

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use courier_base::constants::{DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_FRAME_LENGTH};
use courier_logger::tracing;
use futures::{SinkExt, StreamExt};
use protocol_base::{CallRequest, CallResponse, RemoteError};
use tokio::{
    io::{AsyncRead, AsyncWrite, WriteHalf},
    sync::mpsc,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};

use super::Message;
use crate::{
    codec::{decode_message, encode_message, FrameCodec},
    frame::Frame,
    heartbeat::{is_benign_disconnect, Inbound, ServerHeartbeat},
    serialize::BoxedSerialization,
};

/// Turns a decoded request into its response. Failures are carried inside the
/// response so every request gets exactly one answer.
#[async_trait]
pub trait ExchangeHandler: Send + Sync + 'static {
    async fn handle(&self, request: CallRequest) -> CallResponse;
}

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub idle_timeout: Duration,
    pub max_frame_length: usize,
}

impl Default for ServeOptions {
    fn default() -> Self {
        ServeOptions {
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ServeOptions {
    pub fn with_idle_timeout(self, idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            ..self
        }
    }

    pub fn with_max_frame_length(self, max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            ..self
        }
    }
}

/// Serves one accepted connection until the peer leaves, the read-idle timeout
/// expires, or `shutdown` is cancelled. Requests are handled concurrently and
/// answered in completion order.
pub async fn serve_connection<S>(
    stream: S,
    peer: String,
    handler: Arc<dyn ExchangeHandler>,
    options: ServeOptions,
    serialization: BoxedSerialization,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let codec = FrameCodec::new(options.max_frame_length);
    let mut reader = FramedRead::new(read_half, codec);
    let (outbound, rx) = mpsc::unbounded_channel();
    let closed = shutdown.child_token();
    let writer = tokio::spawn(write_loop(
        FramedWrite::new(write_half, codec),
        rx,
        closed.clone(),
        peer.clone(),
    ));

    let mut heartbeat = ServerHeartbeat::new(options.idle_timeout);
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = tokio::time::timeout_at(heartbeat.deadline(), reader.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                tracing::info!(
                    "nothing received from {} for {:?}, closing connection",
                    peer,
                    heartbeat.idle_timeout()
                );
                break;
            }
            Ok(None) => {
                tracing::debug!("{} closed the connection", peer);
                break;
            }
            Ok(Some(Err(err))) => {
                if is_benign_disconnect(&err) {
                    tracing::debug!("connection from {} dropped: {}", peer, err);
                } else {
                    tracing::warn!("read from {} failed: {}", peer, err);
                }
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let message = match decode_message(frame, &*serialization) {
            Ok(message) => message,
            Err(err) => {
                heartbeat.touch();
                tracing::warn!("dropping undecodable frame from {}: {}", peer, err);
                continue;
            }
        };

        match heartbeat.on_inbound(message) {
            Inbound::Reply(pong) => {
                tracing::trace!("ping from {}", peer);
                if let Ok(frame) = encode_message(&pong, &*serialization) {
                    let _ = outbound.send(frame);
                }
            }
            Inbound::Forward(Message::Request(request)) => {
                let handler = handler.clone();
                let outbound = outbound.clone();
                let serialization = serialization.clone();
                let peer = peer.clone();
                let max_frame_length = options.max_frame_length;
                tokio::spawn(async move {
                    let request_id = request.request_id;
                    let response = handler.handle(request).await;
                    let frame = match response_frame(response, &serialization, max_frame_length)
                    {
                        Some(frame) => frame,
                        None => return,
                    };
                    if outbound.send(frame).is_err() {
                        tracing::debug!(
                            "connection from {} closed before response {} was written",
                            peer,
                            request_id
                        );
                    }
                });
            }
            Inbound::Forward(other) => tracing::warn!(
                "unexpected {:?} message from {}",
                other.message_type(),
                peer
            ),
        }
    }

    closed.cancel();
    drop(outbound);
    let _ = writer.await;
}

fn response_frame(
    response: CallResponse,
    serialization: &BoxedSerialization,
    max_frame_length: usize,
) -> Option<Frame> {
    let request_id = response.request_id;
    let failure = match encode_message(&Message::Response(response), &**serialization) {
        Ok(frame) if frame.body.len() <= max_frame_length => return Some(frame),
        Ok(frame) => format!(
            "response of {} bytes exceeds the limit of {} bytes",
            frame.body.len(),
            max_frame_length
        ),
        Err(err) => format!("failed to serialize response: {}", err),
    };
    tracing::error!("request {}: {}", request_id, failure);

    let fallback = Message::Response(CallResponse::error(
        request_id,
        RemoteError::invocation(failure),
    ));
    match encode_message(&fallback, &**serialization) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::error!("request {} gets no response: {}", request_id, err);
            None
        }
    }
}

async fn write_loop<W>(
    mut writer: FramedWrite<WriteHalf<W>, FrameCodec>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    closed: CancellationToken,
    peer: String,
) where
    W: AsyncRead + AsyncWrite,
{
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(err) = writer.send(frame).await {
            if is_benign_disconnect(&err) {
                tracing::debug!("connection from {} dropped: {}", peer, err);
            } else {
                tracing::warn!("write to {} failed: {}", peer, err);
            }
            break;
        }
    }
    closed.cancel();
    if let Err(err) = writer.close().await {
        tracing::debug!("shutdown of {} failed: {}", peer, err);
    }
}
