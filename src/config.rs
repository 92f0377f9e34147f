/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing agent and connection configuration types and builders.
 */

use crate::mqtt::*;

use std::time::Duration;

pub(crate) const DEFAULT_KEEP_ALIVE_SECONDS : u16 = 1200;

/// Configuration options that determine the field values of the CONNECT packet the protocol
/// engine sends when a Connect command is dispatched.  Carried by Connect commands; the engine
/// owns the actual wire encoding.
#[derive(Debug, Clone)]
pub struct ConnectOptions {

    pub(crate) keep_alive_interval_seconds: Option<u16>,

    pub(crate) clean_session: bool,

    pub(crate) client_id: Option<String>,

    pub(crate) username: Option<String>,

    pub(crate) password: Option<Vec<u8>>,

    pub(crate) will: Option<PublishPacket>,
}

impl ConnectOptions {

    /// Creates a new builder for ConnectOptions instances.
    pub fn builder() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new()
    }

    /// Returns whether or not this configuration requests a clean session.  A clean-session
    /// connect discards any session state the broker retained for this client id.
    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// Returns the client identifier this configuration will connect with, if any.  If unset,
    /// the broker assigns one.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Returns the keep alive interval, in seconds, requested from the broker.
    pub fn keep_alive_interval_seconds(&self) -> Option<u16> {
        self.keep_alive_interval_seconds
    }

    /// Returns the username value to be used in the CONNECT packet, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password value to be used in the CONNECT packet, if any.
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }

    /// Returns the will message registered with the broker on connect, if any.
    pub fn will(&self) -> Option<&PublishPacket> {
        self.will.as_ref()
    }
}

impl Default for ConnectOptions {

    /// Creates a ConnectOptions object with default values.
    ///
    /// In particular, MQTT keep alive is set to a "reasonable" default value rather than
    /// set to zero, which means don't use keep alive.  It is strongly recommended to never set
    /// keep alive to zero.
    fn default() -> Self {
        ConnectOptions {
            keep_alive_interval_seconds: Some(DEFAULT_KEEP_ALIVE_SECONDS),
            clean_session: true,
            client_id: None,
            username: None,
            password: None,
            will: None,
        }
    }
}

/// A builder for connection-related options on the agent.
#[derive(Debug, Default)]
pub struct ConnectOptionsBuilder {
    options: ConnectOptions
}

impl ConnectOptionsBuilder {

    /// Creates a new builder object for ConnectOptions
    pub fn new() -> Self {
        ConnectOptionsBuilder {
            ..Default::default()
        }
    }

    /// Sets the maximum time interval, in seconds, that is permitted to elapse between the
    /// point at which the client finishes transmitting one MQTT packet and the point it starts
    /// sending the next.  The protocol engine maintains this property with PINGREQ packets.
    ///
    /// A value of None means no keep alive will be used, which is not advised due to scenarios
    /// where TCP connections can be invisibly dropped by routers/firewalls within the full
    /// connection circuit.
    pub fn with_keep_alive_interval_seconds(mut self, keep_alive: Option<u16>) -> Self {
        self.options.keep_alive_interval_seconds = keep_alive;
        self
    }

    /// Sets whether or not the broker should discard any existing session state for this
    /// client id on connect.  Connecting with a persistent session (false) is a prerequisite
    /// for resuming unacknowledged QoS 1+ deliveries across reconnects.
    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.options.clean_session = clean_session;
        self
    }

    /// Sets a unique string identifying the client to the server.  Used to restore session
    /// state between connections.  If left empty, the broker will auto-assign a unique
    /// client id.
    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.options.client_id = Some(client_id.to_string());
        self
    }

    /// Sets a string value that the server may use for client authentication and authorization.
    pub fn with_username(mut self, username: &str) -> Self {
        self.options.username = Some(username.to_string());
        self
    }

    /// Sets opaque binary data that the server may use for client authentication and
    /// authorization.
    pub fn with_password(mut self, password: &[u8]) -> Self {
        self.options.password = Some(password.to_vec());
        self
    }

    /// Sets the will message that the broker should publish on the client's behalf if the
    /// connection is lost without a clean disconnect.
    pub fn with_will(mut self, will: PublishPacket) -> Self {
        self.options.will = Some(will);
        self
    }

    /// Builds a new ConnectOptions object from the builder's configuration
    pub fn build(self) -> ConnectOptions {
        self.options
    }
}

pub(crate) const DEFAULT_MAX_OUTSTANDING_ACKS : usize = 20;
pub(crate) const DEFAULT_EVENT_QUEUE_WAIT_MILLIS : u64 = 1000;

/// Configuration options for the agent itself: the sizing of the pending-acknowledgment
/// table and the pacing of the worker loop.
#[derive(Debug, Clone)]
pub struct AgentOptions {

    pub(crate) max_outstanding_acks: usize,

    pub(crate) event_queue_wait: Duration,
}

impl AgentOptions {

    /// Creates a new builder for AgentOptions instances.
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::new()
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        AgentOptions {
            max_outstanding_acks: DEFAULT_MAX_OUTSTANDING_ACKS,
            event_queue_wait: Duration::from_millis(DEFAULT_EVENT_QUEUE_WAIT_MILLIS),
        }
    }
}

/// A builder for agent behavioral options.
#[derive(Debug, Default)]
pub struct AgentOptionsBuilder {
    options: AgentOptions
}

impl AgentOptionsBuilder {

    /// Creates a new builder object for AgentOptions
    pub fn new() -> Self {
        AgentOptionsBuilder {
            ..Default::default()
        }
    }

    /// Sets the capacity of the pending-acknowledgment table.  A dispatch that would exceed
    /// this bound fails the command with an allocation error without sending anything to the
    /// broker.
    pub fn with_max_outstanding_acks(mut self, max_outstanding_acks: usize) -> Self {
        self.options.max_outstanding_acks = max_outstanding_acks;
        self
    }

    /// Sets how long the worker loop waits on the command queue before giving the protocol
    /// engine an I/O cycle.  Smaller values mean more frequent engine servicing when the
    /// queue is idle.
    pub fn with_event_queue_wait(mut self, event_queue_wait: Duration) -> Self {
        self.options.event_queue_wait = event_queue_wait;
        self
    }

    /// Builds a new AgentOptions object from the builder's configuration
    pub fn build(self) -> AgentOptions {
        self.options
    }
}
