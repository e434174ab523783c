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

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use courier_base::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_FRAME_LENGTH, DEFAULT_PING_INTERVAL_SECS,
};
use courier_logger::tracing;
use futures::{SinkExt, StreamExt};
use protocol_base::{CallRequest, CallResponse};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};

use super::{correlator::RequestCorrelator, Message};
use crate::{
    codec::{decode_message, encode_message, FrameCodec},
    error::RemotingError,
    frame::Frame,
    heartbeat::{is_benign_disconnect, ClientHeartbeat},
    serialize::BoxedSerialization,
};

static CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    pub max_frame_length: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ConnectOptions {
    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    pub fn with_ping_interval(self, ping_interval: Duration) -> Self {
        Self {
            ping_interval,
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

/// A multiplexed client connection. Any number of calls may be outstanding;
/// responses are matched to callers by request id.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    address: String,
    outbound: mpsc::UnboundedSender<Frame>,
    correlator: Arc<RequestCorrelator>,
    closed: CancellationToken,
    serialization: BoxedSerialization,
    max_frame_length: usize,
}

impl Connection {
    pub async fn connect(
        address: &str,
        options: &ConnectOptions,
        serialization: BoxedSerialization,
    ) -> Result<Arc<Connection>, RemotingError> {
        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                RemotingError::Connection(format!(
                    "connect to {} timed out after {:?}",
                    address, options.connect_timeout
                ))
            })?
            .map_err(|err| {
                RemotingError::Connection(format!("failed to connect to {}: {}", address, err))
            })?;
        stream.set_nodelay(true)?;
        tracing::debug!("connected to {}", address);
        Ok(Self::from_stream(stream, address, options, serialization))
    }

    pub fn from_stream<S>(
        stream: S,
        address: impl Into<String>,
        options: &ConnectOptions,
        serialization: BoxedSerialization,
    ) -> Arc<Connection>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let address = address.into();
        let (read_half, write_half) = tokio::io::split(stream);
        let codec = FrameCodec::new(options.max_frame_length);
        let (outbound, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Connection {
            id: CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            address,
            outbound,
            correlator: Arc::new(RequestCorrelator::new()),
            closed: CancellationToken::new(),
            serialization,
            max_frame_length: options.max_frame_length,
        });

        tokio::spawn(write_loop(
            FramedWrite::new(write_half, codec),
            rx,
            ClientHeartbeat::new(options.ping_interval),
            connection.closed.clone(),
            connection.serialization.clone(),
            connection.address.clone(),
        ));
        tokio::spawn(read_loop(
            FramedRead::new(read_half, codec),
            connection.correlator.clone(),
            connection.closed.clone(),
            connection.serialization.clone(),
            connection.address.clone(),
        ));
        connection
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_active(&self) -> bool {
        !self.closed.is_cancelled()
    }

    pub fn pending_calls(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn discarded_responses(&self) -> u64 {
        self.correlator.discarded_count()
    }

    /// Sends `request` and waits for the matching response. `None` waits forever.
    pub async fn request(
        &self,
        request: CallRequest,
        timeout: Option<Duration>,
    ) -> Result<CallResponse, RemotingError> {
        let request_id = request.request_id;
        let frame = encode_message(&Message::Request(request), &*self.serialization)?;
        if frame.body.len() > self.max_frame_length {
            return Err(RemotingError::Protocol(format!(
                "request {} body of {} bytes exceeds the limit of {} bytes",
                request_id,
                frame.body.len(),
                self.max_frame_length
            )));
        }

        let pending = self.correlator.register(request_id)?;
        if !self.is_active() {
            return Err(self.closed_error());
        }
        self.outbound.send(frame).map_err(|_| self.closed_error())?;

        match timeout {
            None => pending.wait().await,
            Some(timeout) => match tokio::time::timeout(timeout, pending.wait()).await {
                Ok(result) => result,
                Err(_) => Err(RemotingError::Timeout {
                    request_id,
                    timeout,
                }),
            },
        }
    }

    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            tracing::debug!("closing connection {} to {}", self.id, self.address);
            self.closed.cancel();
        }
    }

    pub async fn wait_closed(&self) {
        self.closed.cancelled().await
    }

    fn closed_error(&self) -> RemotingError {
        RemotingError::Connection(format!("connection to {} is closed", self.address))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

async fn write_loop<W>(
    mut writer: FramedWrite<WriteHalf<W>, FrameCodec>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    mut heartbeat: ClientHeartbeat,
    closed: CancellationToken,
    serialization: BoxedSerialization,
    address: String,
) where
    W: AsyncRead + AsyncWrite,
{
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = tokio::time::timeout(heartbeat.ping_interval(), outbound.recv()) => next,
        };

        match next {
            Ok(Some(frame)) => {
                if let Err(err) = writer.send(frame).await {
                    tracing::warn!("write to {} failed: {}", address, err);
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {
                let ping = match heartbeat.on_write_idle() {
                    Some(ping) => ping,
                    None => continue,
                };
                tracing::debug!(
                    "nothing written to {} for {:?}, sending ping",
                    address,
                    heartbeat.ping_interval()
                );
                let sent = match encode_message(&ping, &*serialization) {
                    Ok(frame) => writer.send(frame).await,
                    Err(err) => Err(err),
                };
                match sent {
                    Ok(()) => heartbeat.on_ping_written(),
                    Err(err) => {
                        tracing::warn!("ping to {} failed: {}", address, err);
                        break;
                    }
                }
            }
        }
    }
    closed.cancel();
    if let Err(err) = writer.close().await {
        tracing::debug!("shutdown of {} failed: {}", address, err);
    }
}

async fn read_loop<R>(
    mut reader: FramedRead<ReadHalf<R>, FrameCodec>,
    correlator: Arc<RequestCorrelator>,
    closed: CancellationToken,
    serialization: BoxedSerialization,
    address: String,
) where
    R: AsyncRead + AsyncWrite,
{
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = reader.next() => next,
        };

        let frame = match next {
            None => {
                tracing::debug!("{} closed the connection", address);
                break;
            }
            Some(Err(err)) => {
                if is_benign_disconnect(&err) {
                    tracing::debug!("connection to {} dropped: {}", address, err);
                } else {
                    tracing::warn!("read from {} failed: {}", address, err);
                }
                break;
            }
            Some(Ok(frame)) => frame,
        };

        let message = match decode_message(frame, &*serialization) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("dropping undecodable frame from {}: {}", address, err);
                continue;
            }
        };

        match ClientHeartbeat::filter_inbound(message) {
            None => tracing::trace!("pong from {}", address),
            Some(Message::Response(response)) => {
                correlator.resolve(response.request_id, response);
            }
            Some(other) => tracing::warn!(
                "unexpected {:?} message from {}",
                other.message_type(),
                address
            ),
        }
    }
    closed.cancel();
    let failed = correlator.fail_all(&format!("connection to {} closed", address));
    if failed > 0 {
        tracing::info!("failed {} outstanding calls to {}", failed, address);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use bytes::Bytes;
    use serde_json::json;
    use tokio::io::DuplexStream;

    use super::*;
    use crate::{
        frame::MessageType,
        serialize::{JsonSerialization, Serialization},
    };

    /// Echoes requests back as responses and answers pings, counting them.
    fn spawn_peer(stream: DuplexStream, pings: Arc<AtomicUsize>) {
        tokio::spawn(async move {
            let (read_half, write_half) = tokio::io::split(stream);
            let mut reader = FramedRead::new(read_half, FrameCodec::default());
            let mut writer = FramedWrite::new(write_half, FrameCodec::default());
            while let Some(Ok(frame)) = reader.next().await {
                let reply = match decode_message(frame, &JsonSerialization).unwrap() {
                    Message::Ping => {
                        pings.fetch_add(1, Ordering::SeqCst);
                        Message::Pong
                    }
                    Message::Request(request) => Message::Response(CallResponse::ok(
                        request.request_id,
                        json!(request.method_name),
                    )),
                    _ => continue,
                };
                let frame = encode_message(&reply, &JsonSerialization).unwrap();
                if writer.send(frame).await.is_err() {
                    break;
                }
            }
        });
    }

    fn options() -> ConnectOptions {
        ConnectOptions::default().with_ping_interval(Duration::from_secs(30))
    }

    fn open(stream: DuplexStream) -> Arc<Connection> {
        Connection::from_stream(stream, "duplex", &options(), Arc::new(JsonSerialization))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_after_write_idle() {
        let (client, server) = tokio::io::duplex(4096);
        let pings = Arc::new(AtomicUsize::new(0));
        spawn_peer(server, pings.clone());
        let connection = open(client);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(pings.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(pings.load(Ordering::SeqCst), 1);
        assert!(connection.is_active());
        assert_eq!(connection.pending_calls(), 0);
        assert_eq!(connection.discarded_responses(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_postpones_ping() {
        let (client, server) = tokio::io::duplex(4096);
        let pings = Arc::new(AtomicUsize::new(0));
        spawn_peer(server, pings.clone());
        let connection = open(client);

        for id in 1..=3 {
            tokio::time::sleep(Duration::from_secs(20)).await;
            let response = connection
                .request(CallRequest::new("svc", "echo").with_request_id(id), None)
                .await
                .unwrap();
            assert_eq!(response.request_id, id);
        }
        assert_eq!(pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_matched() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        spawn_peer(server, Arc::new(AtomicUsize::new(0)));
        let connection = open(client);

        let calls = (1..=20).map(|id| {
            let connection = connection.clone();
            async move {
                connection
                    .request(
                        CallRequest::new("svc", format!("m{}", id)).with_request_id(id),
                        Some(Duration::from_secs(5)),
                    )
                    .await
            }
        });
        let responses = futures::future::join_all(calls).await;
        for (index, response) in responses.into_iter().enumerate() {
            let response = response.unwrap();
            assert_eq!(response.request_id, index as i32 + 1);
            assert_eq!(
                response.into_result().unwrap(),
                json!(format!("m{}", index + 1))
            );
        }
        assert_eq!(connection.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_peer_close_fails_outstanding_calls() {
        let (client, server) = tokio::io::duplex(4096);
        let connection = open(client);

        let call = {
            let connection = connection.clone();
            tokio::spawn(async move {
                connection
                    .request(CallRequest::new("svc", "slow").with_request_id(1), None)
                    .await
            })
        };
        tokio::task::yield_now().await;
        drop(server);

        let result = call.await.unwrap();
        assert!(matches!(result, Err(RemotingError::Connection(_))));
        connection.wait_closed().await;
        assert!(!connection.is_active());

        let again = connection
            .request(CallRequest::new("svc", "again").with_request_id(2), None)
            .await;
        assert!(matches!(again, Err(RemotingError::Connection(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_no_pending_entry() {
        let (client, _server) = tokio::io::duplex(4096);
        let connection = open(client);

        let result = connection
            .request(
                CallRequest::new("svc", "never").with_request_id(9),
                Some(Duration::from_millis(200)),
            )
            .await;
        assert!(matches!(
            result,
            Err(RemotingError::Timeout { request_id: 9, .. })
        ));
        assert_eq!(connection.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_request_is_rejected_locally() {
        let (client, _server) = tokio::io::duplex(4096);
        let connection = Connection::from_stream(
            client,
            "duplex",
            &options().with_max_frame_length(16),
            Arc::new(JsonSerialization),
        );
        let result = connection
            .request(
                CallRequest::new("svc", "big")
                    .with_request_id(1)
                    .with_parameters(vec![json!("x".repeat(64))]),
                None,
            )
            .await;
        assert!(matches!(result, Err(RemotingError::Protocol(_))));
        assert!(connection.is_active());
    }

    #[tokio::test]
    async fn test_undecodable_response_keeps_connection() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (read_half, write_half) = tokio::io::split(server);
            let mut reader = FramedRead::new(read_half, FrameCodec::default());
            let mut writer = FramedWrite::new(write_half, FrameCodec::default());
            while let Some(Ok(frame)) = reader.next().await {
                let request_id = frame.request_id;
                let garbage = Frame::new(
                    JsonSerialization.id(),
                    MessageType::Response,
                    request_id,
                    Bytes::from_static(b"{not json"),
                );
                let reply = encode_message(
                    &Message::Response(CallResponse::ok(request_id, json!("fine"))),
                    &JsonSerialization,
                )
                .unwrap();
                if writer.send(garbage).await.is_err() || writer.send(reply).await.is_err() {
                    break;
                }
            }
        });
        let connection = open(client);

        for id in 1..=2 {
            let response = connection
                .request(
                    CallRequest::new("svc", "echo").with_request_id(id),
                    Some(Duration::from_secs(5)),
                )
                .await
                .unwrap();
            assert!(connection.is_active());
            assert_eq!(response.request_id, id);
            assert_eq!(response.into_result().unwrap(), json!("fine"));
        }
    }
}
