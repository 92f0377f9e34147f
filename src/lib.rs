/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
This crate provides a thread-safety layer for single-threaded MQTT 3.1.1 protocol engines.

MQTT is a publish/subscribe protocol commonly used in IoT use cases.  Most small-footprint
MQTT protocol implementations are single-threaded by design: packet encoding, the socket,
and keepalive state all live in one context that must never be touched concurrently.  This
crate wraps such an engine in an *agent*: a single dedicated worker thread owns the engine
and serializes every protocol interaction, while any number of producer threads submit
publish/subscribe/connect commands through a cheap, cloneable, thread-safe handle.

Producers never wait on the broker.  A submission enqueues a pooled command record and
returns; the result arrives later through a completion callback invoked on the worker
thread, exactly once per command.  Commands that the broker acknowledges (QoS 1+ publishes,
subscribes, unsubscribes) are correlated with their acknowledgments through a fixed-capacity
pending-acknowledgment table, which also drives session resumption: after a reconnect that
rejoins a persistent session, unacknowledged publishes are resent with their original packet
ids and the DUP flag set.

The protocol engine itself (packet encode/decode, transport, keepalive) is injected through
the [`engine::ProtocolEngine`] trait, and the command channel through the
[`queue::MessagingInterface`] trait; [`queue::PooledCommandQueue`] is a ready-made bounded
implementation that allocates every command record up front.

# Example: wiring up an agent

```no_run
use std::sync::Arc;
use std::thread;
use basalt_mqtt::agent::Agent;
use basalt_mqtt::command::CommandInfo;
use basalt_mqtt::config::{AgentOptions, ConnectOptions};
use basalt_mqtt::queue::PooledCommandQueue;
use basalt_mqtt::{PublishPacket, QualityOfService};

# fn build_engine() -> Box<dyn basalt_mqtt::engine::ProtocolEngine> { unimplemented!() }
fn main() {
    let messaging = Arc::new(PooledCommandQueue::new(16, 32));
    let mut agent = Agent::new(
        AgentOptions::default(),
        build_engine(),
        messaging,
        Some(Box::new(|publish| { println!("incoming: {}", publish.topic); })));

    let handle = agent.handle();
    let worker = thread::spawn(move || agent.run());

    handle.connect(ConnectOptions::builder().with_client_id("example").build(), CommandInfo::default()).unwrap();

    let publish = PublishPacket {
        topic: "hello/world".to_string(),
        qos: QualityOfService::AtLeastOnce,
        payload: Some("hi".as_bytes().to_vec()),
        ..Default::default()
    };
    handle.publish(publish, CommandInfo::with_callback(Box::new(|result| {
        println!("publish result: {:?}", result.is_ok());
    }))).unwrap();

    handle.terminate(CommandInfo::default()).unwrap();
    worker.join().unwrap().unwrap();
}
```
*/

#![warn(missing_docs)]

pub mod agent;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
mod logging;
pub mod mqtt;
mod pending;
pub mod queue;
mod validate;

#[cfg(test)]
pub(crate) mod testing;

/* Re-export the mqtt data model types at the root level */
pub use mqtt::QualityOfService;
pub use mqtt::ConnectReturnCode;
pub use mqtt::SubackReturnCode;
pub use mqtt::PublishPacket;
pub use mqtt::Subscription;
pub use mqtt::SubscribePacket;
pub use mqtt::UnsubscribePacket;
pub use mqtt::ConnackPacket;
pub use mqtt::SubackPacket;
pub use mqtt::UnsubackPacket;
pub use mqtt::utils::convert_u8_to_quality_of_service;
