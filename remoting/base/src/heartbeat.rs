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

use std::{io, time::Duration};

use tokio::time::Instant;

use crate::{error::RemotingError, exchange::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Idle,
    PingSent,
}

/// Client side keep-alive. A ping goes out whenever nothing was written for
/// `ping_interval`; pongs are swallowed before response correlation.
#[derive(Debug)]
pub struct ClientHeartbeat {
    ping_interval: Duration,
    state: HeartbeatState,
    pings_sent: u64,
}

impl ClientHeartbeat {
    pub fn new(ping_interval: Duration) -> Self {
        ClientHeartbeat {
            ping_interval,
            state: HeartbeatState::Idle,
            pings_sent: 0,
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }

    /// Returns the ping to write, unless one is already in flight.
    pub fn on_write_idle(&mut self) -> Option<Message> {
        match self.state {
            HeartbeatState::Idle => {
                self.state = HeartbeatState::PingSent;
                Some(Message::Ping)
            }
            HeartbeatState::PingSent => None,
        }
    }

    pub fn on_ping_written(&mut self) {
        self.state = HeartbeatState::Idle;
        self.pings_sent += 1;
    }

    pub fn filter_inbound(message: Message) -> Option<Message> {
        match message {
            Message::Pong => None,
            other => Some(other),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Inbound {
    Reply(Message),
    Forward(Message),
}

/// Server side keep-alive. Answers pings and reports the read-idle deadline.
#[derive(Debug)]
pub struct ServerHeartbeat {
    idle_timeout: Duration,
    last_read: Instant,
}

impl ServerHeartbeat {
    pub fn new(idle_timeout: Duration) -> Self {
        ServerHeartbeat {
            idle_timeout,
            last_read: Instant::now(),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn touch(&mut self) {
        self.last_read = Instant::now();
    }

    pub fn deadline(&self) -> Instant {
        self.last_read + self.idle_timeout
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    pub fn on_inbound(&mut self, message: Message) -> Inbound {
        self.touch();
        match message {
            Message::Ping => Inbound::Reply(Message::Pong),
            other => Inbound::Forward(other),
        }
    }
}

/// Peer resets and half-closed sockets are routine and only logged at debug level.
pub fn is_benign_disconnect(err: &RemotingError) -> bool {
    match err {
        RemotingError::Io(err) => matches!(
            err.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
