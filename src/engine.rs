/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the capability interface through which the agent drives a single-threaded
MQTT 3.1.1 protocol engine.

The engine owns everything the agent does not: packet encoding and decoding, the transport,
keepalive, and the QoS 2 mid-flight exchange (PUBREC/PUBREL).  The agent in turn guarantees
that every method here is invoked from exactly one thread, so implementations need no
interior synchronization.
 */

use crate::config::ConnectOptions;
use crate::error::BasaltResult;
use crate::mqtt::*;

use std::collections::VecDeque;

/// An incoming packet observation surfaced by the protocol engine during a service cycle.
///
/// This is the Rust rendering of a fixed incoming-packet callback slot: rather than calling
/// back into the agent (which owns the engine), the engine appends events to the queue the
/// agent passes into [`ProtocolEngine::service`], and the agent routes them afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PacketEvent {

    /// A PUBLISH arrived from the broker.
    Publish(PublishPacket),

    /// A PUBACK arrived, acknowledging the QoS 1 publish with this packet id.
    Puback(u16),

    /// A PUBREC arrived for the QoS 2 publish with this packet id.  The engine continues the
    /// exchange on its own; the agent only observes it.
    Pubrec(u16),

    /// A PUBCOMP arrived, terminating the QoS 2 exchange for this packet id.
    Pubcomp(u16),

    /// A SUBACK arrived.
    Suback(SubackPacket),

    /// An UNSUBACK arrived.
    Unsuback(UnsubackPacket),

    /// A PINGRESP arrived.  Keepalive state lives in the engine; the agent ignores this.
    Pingresp,
}

/// The protocol-engine capability consumed by the agent, bound once at agent construction.
///
/// Outbound methods hand a packet to the engine for encoding and transmission; they return
/// once the engine has accepted the packet, not once the broker has acknowledged it.
/// Acknowledgments surface later as [`PacketEvent`]s from `service`.
///
/// Errors constructed with `BasaltError::new_connection_closed` or
/// `BasaltError::new_protocol_error` are treated as session-fatal by the agent and halt its
/// worker loop; anything else fails only the command being dispatched.
pub trait ProtocolEngine : Send {

    /// Performs the CONNECT/CONNACK handshake with the configured options.  Blocks until the
    /// CONNACK arrives or the attempt fails; a CONNACK with a failing return code is still a
    /// successful call whose result the caller inspects.
    fn connect(&mut self, options: &ConnectOptions) -> BasaltResult<ConnackPacket>;

    /// Sends a PUBLISH.  The packet id has already been bound by the agent for QoS 1+
    /// publishes and is zero for QoS 0.
    fn publish(&mut self, publish: &PublishPacket) -> BasaltResult<()>;

    /// Sends a SUBSCRIBE.  The packet id has already been bound by the agent.
    fn subscribe(&mut self, subscribe: &SubscribePacket) -> BasaltResult<()>;

    /// Sends an UNSUBSCRIBE.  The packet id has already been bound by the agent.
    fn unsubscribe(&mut self, unsubscribe: &UnsubscribePacket) -> BasaltResult<()>;

    /// Sends a PINGREQ.  The engine tracks the corresponding PINGRESP as part of its
    /// keepalive state.
    fn ping(&mut self) -> BasaltResult<()>;

    /// Sends a DISCONNECT and shuts the connection down.
    fn disconnect(&mut self) -> BasaltResult<()>;

    /// Runs one receive/keepalive I/O cycle, appending an event for every incoming packet
    /// processed.  The agent calls this once per idle worker iteration and routes the events
    /// when it returns, even if it returns an error.
    fn service(&mut self, events: &mut VecDeque<PacketEvent>) -> BasaltResult<()>;

    /// Issues an unused, non-zero protocol packet id for the next acknowledged operation.
    /// Returning zero signals that the engine's packet-id state is broken; the agent fails
    /// the affected command without sending anything.
    fn acquire_packet_id(&mut self) -> u16;
}
