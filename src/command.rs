/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the command record, the envelope that carries one requested MQTT operation
from a producer to the worker, and the completion types producers use to observe results.
 */

use crate::config::ConnectOptions;
use crate::error::BasaltResult;
use crate::mqtt::*;

use std::time::Duration;

// The operation a command record is carrying.  Producers never build these directly; the
// agent handle populates records on their behalf.  The worker's idle process-loop cycle is
// not represented here because it never crosses the queue; the worker drives the engine
// directly when no command arrives.
pub(crate) enum CommandOperation {
    Publish(PublishPacket),
    Subscribe(SubscribePacket),
    Unsubscribe(UnsubscribePacket),
    Connect(ConnectOptions),
    Disconnect,
    Ping,
    Terminate,
}

pub(crate) fn command_operation_to_str(operation: &CommandOperation) -> &'static str {
    match operation {
        CommandOperation::Publish(_) => { "Publish" }
        CommandOperation::Subscribe(_) => { "Subscribe" }
        CommandOperation::Unsubscribe(_) => { "Unsubscribe" }
        CommandOperation::Connect(_) => { "Connect" }
        CommandOperation::Disconnect => { "Disconnect" }
        CommandOperation::Ping => { "Ping" }
        CommandOperation::Terminate => { "Terminate" }
    }
}

/// Result data delivered to a command's completion callback when the command succeeds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandResponse {

    /// A publish completed.  Carries the packet id the publish went out with on the wire;
    /// zero for QoS 0 publishes, which are never acknowledged.
    Publish(u16),

    /// A subscribe completed.  Carries the broker's SUBACK, whose per-filter return codes
    /// may individually indicate refusal.
    Subscribe(SubackPacket),

    /// An unsubscribe completed.  Carries the broker's UNSUBACK.
    Unsubscribe(UnsubackPacket),

    /// A connect completed.  Carries the broker's CONNACK; a failing return code still
    /// completes the command successfully, and the caller is expected to inspect it.
    Connect(ConnackPacket),

    /// A disconnect was handed to the protocol engine.
    Disconnect,

    /// A ping was handed to the protocol engine.  The PINGRESP is tracked by the engine's
    /// keepalive state, not by the agent.
    Ping,

    /// The terminate command itself completed, after all other outstanding work was
    /// cancelled.
    Terminate,
}

/// Final result of a submitted command, as seen by its completion callback.
pub type CommandResult = BasaltResult<CommandResponse>;

/// Completion callback for a submitted command.  Invoked exactly once, always from the worker
/// thread.  Any state the callback needs should be captured by the closure; producers must
/// synchronize access to anything they share with it.
pub type CommandCompletionCallback = Box<dyn FnOnce(CommandResult) + Send + 'static>;

/// Per-submission options supplied alongside every producer operation.
pub struct CommandInfo {

    /// Callback invoked from the worker thread when the command reaches its final status.
    /// Commands submitted without a callback are still dispatched; their results are
    /// discarded.
    pub completion_callback: Option<CommandCompletionCallback>,

    /// Upper bound on how long the submission may block while acquiring a command record and
    /// while enqueueing it.  `Duration::ZERO` means fail immediately if either would block;
    /// `Duration::MAX` means wait indefinitely.
    pub block_time: Duration,
}

impl CommandInfo {

    /// Creates a CommandInfo with the given completion callback and an unbounded block time.
    pub fn with_callback(completion_callback: CommandCompletionCallback) -> Self {
        CommandInfo {
            completion_callback: Some(completion_callback),
            block_time: Duration::MAX,
        }
    }
}

impl Default for CommandInfo {
    fn default() -> Self {
        CommandInfo {
            completion_callback: None,
            block_time: Duration::MAX,
        }
    }
}

/// A pooled record describing one requested MQTT operation.
///
/// Records live in the messaging interface's allocator.  A producer acquires one, the agent
/// handle populates it, ownership transfers to the worker on a successful send, and the
/// worker releases it back to the allocator after the completion callback has run.  The
/// record's interior is deliberately opaque; messaging implementations move records around
/// without inspecting them.
pub struct Command {
    pub(crate) operation: Option<CommandOperation>,

    pub(crate) completion_callback: Option<CommandCompletionCallback>,

    // Protocol packet id bound at dispatch time for operations the broker acknowledges.
    pub(crate) packet_id: u16,
}

impl Command {

    pub(crate) fn prepare(&mut self, operation: CommandOperation, completion_callback: Option<CommandCompletionCallback>) {
        self.operation = Some(operation);
        self.completion_callback = completion_callback;
        self.packet_id = 0;
    }

    pub(crate) fn take_callback(&mut self) -> Option<CommandCompletionCallback> {
        self.completion_callback.take()
    }

    pub(crate) fn operation_name(&self) -> &'static str {
        match &self.operation {
            Some(operation) => { command_operation_to_str(operation) }
            None => { "Unbound" }
        }
    }

    pub(crate) fn publish_packet(&self) -> Option<&PublishPacket> {
        if let Some(CommandOperation::Publish(publish)) = &self.operation {
            return Some(publish);
        }

        None
    }

    pub(crate) fn publish_packet_mut(&mut self) -> Option<&mut PublishPacket> {
        if let Some(CommandOperation::Publish(publish)) = &mut self.operation {
            return Some(publish);
        }

        None
    }

    pub(crate) fn subscribe_packet(&self) -> Option<&SubscribePacket> {
        if let Some(CommandOperation::Subscribe(subscribe)) = &self.operation {
            return Some(subscribe);
        }

        None
    }

    pub(crate) fn unsubscribe_packet(&self) -> Option<&UnsubscribePacket> {
        if let Some(CommandOperation::Unsubscribe(unsubscribe)) = &self.operation {
            return Some(unsubscribe);
        }

        None
    }

    /// Returns a record to its pooled state, dropping any payload and unfired callback it
    /// still holds.  Messaging implementations call this when a record is released.
    pub fn reset(&mut self) {
        self.operation = None;
        self.completion_callback = None;
        self.packet_id = 0;
    }
}

impl Default for Command {

    /// Creates an empty record suitable for seeding a command allocator.
    fn default() -> Self {
        Command {
            operation: None,
            completion_callback: None,
            packet_id: 0,
        }
    }
}
