/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the agent itself: the thread-safe producer handle, the single-threaded
worker loop that serializes all protocol interactions, and session control.

One [`Agent`] wraps one protocol engine and is owned by exactly one worker thread.  Any
number of producer threads hold clones of its [`AgentHandle`] and submit commands through it;
submissions never wait on the broker.  Every command's completion callback runs on the worker
thread, exactly once.
 */

#![warn(missing_docs)]

use crate::command::*;
use crate::config::*;
use crate::engine::*;
use crate::error::{BasaltError, BasaltResult};
use crate::mqtt::*;
use crate::pending::*;
use crate::queue::MessagingInterface;
use crate::validate::*;

use log::*;

use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Sink for publishes arriving from the broker.  Invoked from the worker thread for every
/// incoming PUBLISH the protocol engine surfaces, regardless of which subscription matched
/// it.  Captured state plays the role of the sink's user context.
pub type IncomingPublishHandler = Box<dyn FnMut(PublishPacket) + Send>;

// Runs a command's completion callback (if one was registered) and returns the record to the
// allocator.  Completion and release are fused here so no path can do one without the other.
fn complete_command(messaging: &dyn MessagingInterface, mut command: Box<Command>, result: CommandResult) {
    if let Some(callback) = command.take_callback() {
        (callback)(result);
    }

    messaging.release_command(command);
}

/// The worker-owned half of the agent.
///
/// Owns the protocol engine, the pending-acknowledgment table, and the incoming-publish
/// sink.  All methods take `&mut self` and the type is not cloneable, which is what enforces
/// the one-worker-per-context invariant: the only part of the agent that crosses threads is
/// the [`AgentHandle`].
///
/// After [`Agent::run`] returns due to a terminate command, the agent is spent; build a new
/// one to start over.  If it returns a session-fatal error instead, the caller is expected
/// to reconnect through the engine and then call [`Agent::resume_session`] before running
/// the loop again.
pub struct Agent {
    engine: Box<dyn ProtocolEngine>,

    messaging: Arc<dyn MessagingInterface>,

    pending_acks: PendingAckTable,

    incoming_publish_handler: Option<IncomingPublishHandler>,

    // reused across service cycles so the steady-state loop does not allocate
    packet_events: VecDeque<PacketEvent>,

    event_queue_wait: Duration,

    terminated: bool,
}

impl Agent {

    /// Creates a new agent over the given protocol engine and messaging interface.  The
    /// engine must not be shared with anything else; the agent serializes every interaction
    /// with it.
    pub fn new(options: AgentOptions, engine: Box<dyn ProtocolEngine>, messaging: Arc<dyn MessagingInterface>, incoming_publish_handler: Option<IncomingPublishHandler>) -> Self {
        debug!("Creating new MQTT agent - options: {:?}", options);

        Agent {
            engine,
            messaging,
            pending_acks: PendingAckTable::new(options.max_outstanding_acks),
            incoming_publish_handler,
            packet_events: VecDeque::new(),
            event_queue_wait: options.event_queue_wait,
            terminated: false,
        }
    }

    /// Creates a producer handle bound to this agent's command queue.  Handles are cheap to
    /// clone and safe to use from any thread.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            messaging: self.messaging.clone()
        }
    }

    /// Runs the worker loop until a terminate command is dispatched or the session breaks.
    ///
    /// Each iteration waits up to the configured event-queue wait for a command, dispatches
    /// it if one arrived, and otherwise gives the protocol engine one I/O cycle.  Returns
    /// `Ok(())` after terminate; returns the session-fatal error otherwise, leaving queued
    /// commands and pending acknowledgments intact for session resumption.
    pub fn run(&mut self) -> BasaltResult<()> {
        if self.terminated {
            error!("run - agent context already terminated");
            return Err(BasaltError::new_internal_state_error("agent context already terminated"));
        }

        info!("run - agent command loop starting");

        loop {
            let command = self.messaging.receive(self.event_queue_wait);

            let result =
                match command {
                    Some(command) => { self.dispatch_command(command) }
                    None => { self.dispatch_process_loop() }
                };

            self.log_state();

            if let Err(error) = result {
                error!("run - agent command loop halting: {}", error);
                return Err(error);
            }

            if self.terminated {
                info!("run - agent command loop exiting after terminate");
                return Ok(());
            }
        }
    }

    /// Reconciles agent state with the broker after the engine has reconnected.
    ///
    /// `session_present` is the flag from the reconnect's CONNACK.  When true, every
    /// unacknowledged QoS 1+ publish is resent with its original packet id and the DUP flag
    /// set; the pending entries stay installed so acknowledgments that arrive later still
    /// match.  Subscribes and unsubscribes are not replayed; a present session means the
    /// broker retained them.  When false, the broker kept nothing, so all outstanding work
    /// is failed as interrupted instead.
    pub fn resume_session(&mut self, session_present: bool) -> BasaltResult<()> {
        if !session_present {
            info!("resume_session - no session present; abandoning outstanding work");
            self.cancel_all();
            return Ok(());
        }

        info!("resume_session - session present; replaying unacknowledged publishes");

        for entry in self.pending_acks.iter_mut() {
            if let Some(publish) = entry.command.publish_packet_mut() {
                publish.duplicate = true;
                debug!("resume_session - resending publish with packet id {}", entry.packet_id);
                self.engine.publish(publish)?;
            }
        }

        Ok(())
    }

    /// Fails every pending acknowledgment entry and every queued command as interrupted,
    /// running each completion callback before its record is released.  Afterwards both the
    /// table and the queue are empty.
    pub fn cancel_all(&mut self) {
        let pending = self.pending_acks.drain();
        if !pending.is_empty() {
            info!("cancel_all - abandoning {} unacknowledged commands", pending.len());
        }

        for entry in pending {
            complete_command(
                self.messaging.as_ref(),
                entry.command,
                Err(BasaltError::new_interrupted("command abandoned before its acknowledgment arrived")));
        }

        let mut drained : usize = 0;
        while let Some(command) = self.messaging.receive(Duration::ZERO) {
            drained += 1;
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_interrupted("command abandoned while waiting in the queue")));
        }

        if drained > 0 {
            info!("cancel_all - abandoned {} queued commands", drained);
        }
    }

    // Translates one command into protocol-engine calls.  Returns an error only when the
    // session underneath the engine is broken; every command-scoped failure is delivered
    // through the command's completion callback instead.
    pub(crate) fn dispatch_command(&mut self, mut command: Box<Command>) -> BasaltResult<()> {
        debug!("dispatch_command - {} command", command.operation_name());

        let operation = command.operation.take();
        match operation {
            Some(CommandOperation::Publish(publish)) => { self.dispatch_publish(command, publish) }
            Some(CommandOperation::Subscribe(subscribe)) => { self.dispatch_subscribe(command, subscribe) }
            Some(CommandOperation::Unsubscribe(unsubscribe)) => { self.dispatch_unsubscribe(command, unsubscribe) }
            Some(CommandOperation::Connect(options)) => { self.dispatch_connect(command, options) }
            Some(CommandOperation::Disconnect) => { self.dispatch_disconnect(command) }
            Some(CommandOperation::Ping) => { self.dispatch_ping(command) }
            Some(CommandOperation::Terminate) => { self.dispatch_terminate(command) }
            None => {
                error!("dispatch_command - command record carries no operation");
                complete_command(
                    self.messaging.as_ref(),
                    command,
                    Err(BasaltError::new_internal_state_error("command record carries no operation")));
                Ok(())
            }
        }
    }

    // Gives the protocol engine one I/O cycle and routes whatever packets it observed.
    // Events are routed even when the cycle itself fails; packets decoded before the failure
    // still complete their commands.
    pub(crate) fn dispatch_process_loop(&mut self) -> BasaltResult<()> {
        let result = self.engine.service(&mut self.packet_events);
        self.route_packet_events();

        result
    }

    fn dispatch_publish(&mut self, mut command: Box<Command>, mut publish: PublishPacket) -> BasaltResult<()> {
        if publish.qos == QualityOfService::AtMostOnce {
            return match self.engine.publish(&publish) {
                Ok(()) => {
                    complete_command(self.messaging.as_ref(), command, Ok(CommandResponse::Publish(0)));
                    Ok(())
                }
                Err(error) => { self.fail_dispatch(command, error) }
            };
        }

        let packet_id = self.engine.acquire_packet_id();
        if packet_id == 0 {
            error!("dispatch_publish - protocol engine failed to issue a packet id");
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_internal_state_error("protocol engine failed to issue a packet id")));
            return Ok(());
        }

        publish.packet_id = packet_id;
        command.packet_id = packet_id;
        command.operation = Some(CommandOperation::Publish(publish));

        if let Err(result) = self.install_pending_entry(packet_id, command, "dispatch_publish") {
            return result;
        }

        let send_result =
            match self.pending_acks.get(packet_id).and_then(|entry| entry.command.publish_packet()) {
                Some(packet) => { self.engine.publish(packet) }
                None => { Err(BasaltError::new_internal_state_error("pending entry vanished during dispatch")) }
            };

        self.finish_tracked_dispatch(packet_id, send_result)
    }

    fn dispatch_subscribe(&mut self, mut command: Box<Command>, mut subscribe: SubscribePacket) -> BasaltResult<()> {
        let packet_id = self.engine.acquire_packet_id();
        if packet_id == 0 {
            error!("dispatch_subscribe - protocol engine failed to issue a packet id");
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_internal_state_error("protocol engine failed to issue a packet id")));
            return Ok(());
        }

        subscribe.packet_id = packet_id;
        command.packet_id = packet_id;
        command.operation = Some(CommandOperation::Subscribe(subscribe));

        if let Err(result) = self.install_pending_entry(packet_id, command, "dispatch_subscribe") {
            return result;
        }

        let send_result =
            match self.pending_acks.get(packet_id).and_then(|entry| entry.command.subscribe_packet()) {
                Some(packet) => { self.engine.subscribe(packet) }
                None => { Err(BasaltError::new_internal_state_error("pending entry vanished during dispatch")) }
            };

        self.finish_tracked_dispatch(packet_id, send_result)
    }

    fn dispatch_unsubscribe(&mut self, mut command: Box<Command>, mut unsubscribe: UnsubscribePacket) -> BasaltResult<()> {
        let packet_id = self.engine.acquire_packet_id();
        if packet_id == 0 {
            error!("dispatch_unsubscribe - protocol engine failed to issue a packet id");
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_internal_state_error("protocol engine failed to issue a packet id")));
            return Ok(());
        }

        unsubscribe.packet_id = packet_id;
        command.packet_id = packet_id;
        command.operation = Some(CommandOperation::Unsubscribe(unsubscribe));

        if let Err(result) = self.install_pending_entry(packet_id, command, "dispatch_unsubscribe") {
            return result;
        }

        let send_result =
            match self.pending_acks.get(packet_id).and_then(|entry| entry.command.unsubscribe_packet()) {
                Some(packet) => { self.engine.unsubscribe(packet) }
                None => { Err(BasaltError::new_internal_state_error("pending entry vanished during dispatch")) }
            };

        self.finish_tracked_dispatch(packet_id, send_result)
    }

    fn dispatch_connect(&mut self, command: Box<Command>, options: ConnectOptions) -> BasaltResult<()> {
        debug!("dispatch_connect - {}", options);

        match self.engine.connect(&options) {
            Ok(connack) => {
                if connack.return_code.is_success() {
                    info!("dispatch_connect - connected, {}", connack);
                } else {
                    warn!("dispatch_connect - broker refused connection, {}", connack);
                }

                complete_command(self.messaging.as_ref(), command, Ok(CommandResponse::Connect(connack)));
                Ok(())
            }
            Err(error) => { self.fail_dispatch(command, error) }
        }
    }

    fn dispatch_disconnect(&mut self, command: Box<Command>) -> BasaltResult<()> {
        match self.engine.disconnect() {
            Ok(()) => {
                info!("dispatch_disconnect - disconnect handed to protocol engine");
                complete_command(self.messaging.as_ref(), command, Ok(CommandResponse::Disconnect));
                Ok(())
            }
            Err(error) => { self.fail_dispatch(command, error) }
        }
    }

    fn dispatch_ping(&mut self, command: Box<Command>) -> BasaltResult<()> {
        match self.engine.ping() {
            Ok(()) => {
                complete_command(self.messaging.as_ref(), command, Ok(CommandResponse::Ping));
                Ok(())
            }
            Err(error) => { self.fail_dispatch(command, error) }
        }
    }

    fn dispatch_terminate(&mut self, command: Box<Command>) -> BasaltResult<()> {
        info!("dispatch_terminate - cancelling all outstanding work");

        self.terminated = true;
        self.cancel_all();

        complete_command(self.messaging.as_ref(), command, Ok(CommandResponse::Terminate));
        Ok(())
    }

    // Installs a pending-ack entry for a bound command.  On failure the command has already
    // been completed without anything reaching the engine; the wrapped value is what the
    // dispatch should return.
    fn install_pending_entry(&mut self, packet_id: u16, command: Box<Command>, context: &str) -> Result<(), BasaltResult<()>> {
        if self.pending_acks.is_full() {
            warn!("{} - pending acknowledgment table full ({} entries); failing command", context, self.pending_acks.capacity());
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_allocation_failure("pending acknowledgment table full")));
            return Err(Ok(()));
        }

        if let Err(command) = self.pending_acks.store(packet_id, command) {
            error!("{} - failed to install pending entry for packet id {}", context, packet_id);
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_internal_state_error("packet id collision in pending acknowledgment table")));
            return Err(Ok(()));
        }

        debug!("{} - installed pending entry for packet id {}", context, packet_id);
        Ok(())
    }

    // Resolves an engine send made on behalf of a tracked command: success leaves the entry
    // installed awaiting its ack, failure uninstalls it and completes the command.
    fn finish_tracked_dispatch(&mut self, packet_id: u16, send_result: BasaltResult<()>) -> BasaltResult<()> {
        match send_result {
            Ok(()) => { Ok(()) }
            Err(error) => {
                match self.pending_acks.remove(packet_id) {
                    Some(entry) => { self.fail_dispatch(entry.command, error) }
                    None => { Err(error) }
                }
            }
        }
    }

    // Completes a command that failed at dispatch.  Command-scoped failures go verbatim to
    // the completion callback and the loop continues; session-fatal failures surface to the
    // loop, and the command is failed as interrupted the same way cancel-all would.
    fn fail_dispatch(&mut self, command: Box<Command>, error: BasaltError) -> BasaltResult<()> {
        if error.is_session_fatal() {
            error!("fail_dispatch - session-fatal dispatch failure: {}", error);
            complete_command(
                self.messaging.as_ref(),
                command,
                Err(BasaltError::new_interrupted("session failed while the command was in flight")));
            return Err(error);
        }

        complete_command(self.messaging.as_ref(), command, Err(error));
        Ok(())
    }

    // The incoming-packet demultiplexer.  Acks are matched against the pending table and
    // complete their commands; publishes go to the incoming-publish sink; everything the
    // engine tracks internally is ignored here.
    fn route_packet_events(&mut self) {
        while let Some(event) = self.packet_events.pop_front() {
            match event {
                PacketEvent::Publish(publish) => {
                    debug!("route_packet_events - incoming {}", publish);
                    match self.incoming_publish_handler.as_mut() {
                        Some(handler) => { (handler)(publish) }
                        None => {
                            warn!("route_packet_events - no incoming publish handler configured; dropping publish");
                        }
                    }
                }
                PacketEvent::Puback(packet_id) => {
                    self.complete_pending_publish(packet_id, "PUBACK");
                }
                PacketEvent::Pubcomp(packet_id) => {
                    self.complete_pending_publish(packet_id, "PUBCOMP");
                }
                PacketEvent::Suback(suback) => {
                    info!("route_packet_events - {}", suback);
                    match self.pending_acks.remove(suback.packet_id) {
                        Some(entry) => {
                            complete_command(self.messaging.as_ref(), entry.command, Ok(CommandResponse::Subscribe(suback)));
                        }
                        None => {
                            warn!("route_packet_events - no pending subscribe for SUBACK packet id {}; ignoring", suback.packet_id);
                        }
                    }
                }
                PacketEvent::Unsuback(unsuback) => {
                    info!("route_packet_events - {}", unsuback);
                    match self.pending_acks.remove(unsuback.packet_id) {
                        Some(entry) => {
                            complete_command(self.messaging.as_ref(), entry.command, Ok(CommandResponse::Unsubscribe(unsuback)));
                        }
                        None => {
                            warn!("route_packet_events - no pending unsubscribe for UNSUBACK packet id {}; ignoring", unsuback.packet_id);
                        }
                    }
                }
                PacketEvent::Pubrec(packet_id) => {
                    // mid-flight qos2 state belongs to the engine; the table waits for PUBCOMP
                    debug!("route_packet_events - PUBREC observed for packet id {}", packet_id);
                }
                PacketEvent::Pingresp => {
                    debug!("route_packet_events - PINGRESP observed");
                }
            }
        }
    }

    fn complete_pending_publish(&mut self, packet_id: u16, ack_name: &str) {
        info!("route_packet_events - {} for packet id {}", ack_name, packet_id);

        match self.pending_acks.remove(packet_id) {
            Some(entry) => {
                complete_command(self.messaging.as_ref(), entry.command, Ok(CommandResponse::Publish(packet_id)));
            }
            None => {
                warn!("route_packet_events - no pending publish for {} packet id {}; ignoring", ack_name, packet_id);
            }
        }
    }

    fn log_state(&self) {
        let level = log::max_level();
        match level {
            LevelFilter::Debug | LevelFilter::Trace => {
                debug!("{}", self);
            }
            _ => {}
        }
    }
}

impl Display for Agent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AgentState: {{")?;
        write!(f, " pending_acks:{}/{},", self.pending_acks.len(), self.pending_acks.capacity())?;
        write!(f, " terminated:{}", self.terminated)?;
        write!(f, " }}")?;

        Ok(())
    }
}

/// The producer-facing half of the agent.
///
/// Thread-safe and cheap to clone.  Every operation allocates a command record, populates
/// it, and enqueues it for the worker; none of them waits for the broker.  The only blocking
/// a producer can experience is bounded by the `block_time` in the supplied [`CommandInfo`],
/// covering record allocation and enqueueing.
#[derive(Clone)]
pub struct AgentHandle {
    messaging: Arc<dyn MessagingInterface>,
}

impl AgentHandle {

    /// Submits a Publish command.  QoS 0 publishes complete as soon as the engine accepts
    /// the packet; QoS 1+ publishes complete when the terminal acknowledgment arrives.
    pub fn publish(&self, packet: PublishPacket, info: CommandInfo) -> BasaltResult<()> {
        validate_publish(&packet)?;

        self.submit(CommandOperation::Publish(packet), info)
    }

    /// Submits a Subscribe command.  Completes when the SUBACK arrives; the callback
    /// receives the per-filter return codes and should inspect them for refusals.
    pub fn subscribe(&self, packet: SubscribePacket, info: CommandInfo) -> BasaltResult<()> {
        validate_subscribe(&packet)?;

        self.submit(CommandOperation::Subscribe(packet), info)
    }

    /// Submits an Unsubscribe command.  Completes when the UNSUBACK arrives.
    pub fn unsubscribe(&self, packet: UnsubscribePacket, info: CommandInfo) -> BasaltResult<()> {
        validate_unsubscribe(&packet)?;

        self.submit(CommandOperation::Unsubscribe(packet), info)
    }

    /// Submits a Connect command.  Completes with the CONNACK result once the engine's
    /// handshake finishes; a refused connection is surfaced through the CONNACK return code,
    /// not as an error.
    pub fn connect(&self, options: ConnectOptions, info: CommandInfo) -> BasaltResult<()> {
        validate_connect(&options)?;

        self.submit(CommandOperation::Connect(options), info)
    }

    /// Submits a Disconnect command.  Completes once the engine has shut the connection
    /// down.
    pub fn disconnect(&self, info: CommandInfo) -> BasaltResult<()> {
        self.submit(CommandOperation::Disconnect, info)
    }

    /// Submits a Ping command.  Completes once the engine accepts the PINGREQ; the response
    /// is tracked by the engine's keepalive state.
    pub fn ping(&self, info: CommandInfo) -> BasaltResult<()> {
        self.submit(CommandOperation::Ping, info)
    }

    /// Submits a Terminate command.  When dispatched, every pending acknowledgment and every
    /// command still in the queue is failed as interrupted, the terminate's own callback
    /// fires with success, and the worker loop exits.  The agent cannot be reused afterward.
    pub fn terminate(&self, info: CommandInfo) -> BasaltResult<()> {
        self.submit(CommandOperation::Terminate, info)
    }

    fn submit(&self, operation: CommandOperation, info: CommandInfo) -> BasaltResult<()> {
        let CommandInfo { completion_callback, block_time } = info;

        let mut command =
            match self.messaging.acquire_command(block_time) {
                Some(command) => { command }
                None => {
                    warn!("submit - no command records available");
                    return Err(BasaltError::new_allocation_failure("no command records available"));
                }
            };

        command.prepare(operation, completion_callback);
        debug!("submit - enqueuing {} command", command.operation_name());

        match self.messaging.send(command, block_time) {
            Ok(()) => { Ok(()) }
            Err(command) => {
                warn!("submit - command queue refused {} command", command.operation_name());
                self.messaging.release_command(command);
                Err(BasaltError::new_submission_failure("command queue refused the submission"))
            }
        }
    }
}
