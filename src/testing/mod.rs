/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */


use crate::agent::{Agent, AgentHandle};
use crate::command::{CommandCompletionCallback, CommandResult};
use crate::config::*;
use crate::engine::*;
use crate::error::{BasaltError, BasaltResult};
use crate::mqtt::*;
use crate::queue::{MessagingInterface, PooledCommandQueue};

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

// Generous bound for test waits; anything that takes this long is a deadlock, not a slow
// machine.
pub(crate) const TEST_WAIT_TIMEOUT : Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum EngineCall {
    Connect,
    Publish(PublishPacket),
    Subscribe(SubscribePacket),
    Unsubscribe(UnsubscribePacket),
    Ping,
    Disconnect,
    Service,
}

// Scriptable stand-in for a protocol engine.  Records every call it receives, optionally
// synthesizes the matching broker acknowledgments (delivered on the next service cycle, the
// way a real engine would observe them), and fails any single operation once when a failure
// is loaded into its slot.
pub(crate) struct MockEngineState {
    pub(crate) calls: Vec<EngineCall>,

    // events the next service cycle will surface
    pub(crate) events: VecDeque<PacketEvent>,

    // next value acquire_packet_id hands out; set to zero to simulate id exhaustion
    pub(crate) next_packet_id: u16,

    pub(crate) auto_ack: bool,

    pub(crate) connack: ConnackPacket,

    pub(crate) connect_failure: Option<BasaltError>,
    pub(crate) publish_failure: Option<BasaltError>,
    pub(crate) subscribe_failure: Option<BasaltError>,
    pub(crate) unsubscribe_failure: Option<BasaltError>,
    pub(crate) ping_failure: Option<BasaltError>,
    pub(crate) disconnect_failure: Option<BasaltError>,
    pub(crate) service_failure: Option<BasaltError>,
}

impl MockEngineState {
    pub(crate) fn publish_calls(&self) -> Vec<PublishPacket> {
        self.calls.iter().filter_map(|call| {
            if let EngineCall::Publish(publish) = call {
                Some(publish.clone())
            } else {
                None
            }
        }).collect()
    }

    pub(crate) fn service_call_count(&self) -> usize {
        self.calls.iter().filter(|call| { matches!(call, EngineCall::Service) }).count()
    }
}

impl Default for MockEngineState {
    fn default() -> Self {
        MockEngineState {
            calls: Vec::new(),
            events: VecDeque::new(),
            next_packet_id: 1,
            auto_ack: false,
            connack: ConnackPacket {
                ..Default::default()
            },
            connect_failure: None,
            publish_failure: None,
            subscribe_failure: None,
            unsubscribe_failure: None,
            ping_failure: None,
            disconnect_failure: None,
            service_failure: None,
        }
    }
}

pub(crate) struct MockEngine {
    state: Arc<Mutex<MockEngineState>>,
}

impl MockEngine {
    pub(crate) fn new() -> (MockEngine, Arc<Mutex<MockEngineState>>) {
        let state = Arc::new(Mutex::new(MockEngineState::default()));

        (MockEngine { state: state.clone() }, state)
    }
}

fn suback_return_code_for_qos(qos: QualityOfService) -> SubackReturnCode {
    match qos {
        QualityOfService::AtMostOnce => { SubackReturnCode::SuccessQos0 }
        QualityOfService::AtLeastOnce => { SubackReturnCode::SuccessQos1 }
        QualityOfService::ExactlyOnce => { SubackReturnCode::SuccessQos2 }
    }
}

impl ProtocolEngine for MockEngine {

    fn connect(&mut self, _: &ConnectOptions) -> BasaltResult<ConnackPacket> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Connect);

        if let Some(error) = state.connect_failure.take() {
            return Err(error);
        }

        Ok(state.connack)
    }

    fn publish(&mut self, publish: &PublishPacket) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Publish(publish.clone()));

        if let Some(error) = state.publish_failure.take() {
            return Err(error);
        }

        if state.auto_ack {
            match publish.qos {
                QualityOfService::AtMostOnce => {}
                QualityOfService::AtLeastOnce => {
                    state.events.push_back(PacketEvent::Puback(publish.packet_id));
                }
                QualityOfService::ExactlyOnce => {
                    state.events.push_back(PacketEvent::Pubrec(publish.packet_id));
                    state.events.push_back(PacketEvent::Pubcomp(publish.packet_id));
                }
            }
        }

        Ok(())
    }

    fn subscribe(&mut self, subscribe: &SubscribePacket) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Subscribe(subscribe.clone()));

        if let Some(error) = state.subscribe_failure.take() {
            return Err(error);
        }

        if state.auto_ack {
            let suback = SubackPacket {
                packet_id: subscribe.packet_id,
                return_codes: subscribe.subscriptions.iter().map(|subscription| {
                    suback_return_code_for_qos(subscription.qos)
                }).collect(),
            };
            state.events.push_back(PacketEvent::Suback(suback));
        }

        Ok(())
    }

    fn unsubscribe(&mut self, unsubscribe: &UnsubscribePacket) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Unsubscribe(unsubscribe.clone()));

        if let Some(error) = state.unsubscribe_failure.take() {
            return Err(error);
        }

        if state.auto_ack {
            state.events.push_back(PacketEvent::Unsuback(UnsubackPacket {
                packet_id: unsubscribe.packet_id
            }));
        }

        Ok(())
    }

    fn ping(&mut self) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Ping);

        if let Some(error) = state.ping_failure.take() {
            return Err(error);
        }

        Ok(())
    }

    fn disconnect(&mut self) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Disconnect);

        if let Some(error) = state.disconnect_failure.take() {
            return Err(error);
        }

        Ok(())
    }

    fn service(&mut self, events: &mut VecDeque<PacketEvent>) -> BasaltResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Service);

        if let Some(error) = state.service_failure.take() {
            return Err(error);
        }

        events.append(&mut state.events);

        Ok(())
    }

    fn acquire_packet_id(&mut self) -> u16 {
        let mut state = self.state.lock().unwrap();
        if state.next_packet_id == 0 {
            return 0;
        }

        let packet_id = state.next_packet_id;
        state.next_packet_id += 1;

        packet_id
    }
}

// Mutex-and-condvar accumulator that lets producer-side tests wait on completion callbacks
// fired from the worker thread.
pub(crate) struct ResultCollector {
    shared: Arc<(Mutex<Vec<(String, CommandResult)>>, Condvar)>,
}

impl ResultCollector {

    pub(crate) fn new() -> Self {
        ResultCollector {
            shared: Arc::new((Mutex::new(Vec::new()), Condvar::new()))
        }
    }

    pub(crate) fn callback(&self, tag: &str) -> CommandCompletionCallback {
        let shared = self.shared.clone();
        let tag = tag.to_string();

        Box::new(move |result| {
            let (results, signal) = &*shared;
            results.lock().unwrap().push((tag, result));
            signal.notify_all();
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.0.lock().unwrap().len()
    }

    // Blocks until at least `count` results have arrived, then hands all of them over in
    // callback-invocation order.
    pub(crate) fn wait_and_take(&self, count: usize) -> Vec<(String, CommandResult)> {
        let deadline = Instant::now() + TEST_WAIT_TIMEOUT;
        let (results, signal) = &*self.shared;

        let mut guard = results.lock().unwrap();
        while guard.len() < count {
            let now = Instant::now();
            if now >= deadline {
                panic!("timed out waiting for {} command results; have {}", count, guard.len());
            }

            let (reacquired, _) = signal.wait_timeout(guard, deadline - now).unwrap();
            guard = reacquired;
        }

        std::mem::take(&mut *guard)
    }

    pub(crate) fn take(&self) -> Vec<(String, CommandResult)> {
        std::mem::take(&mut *self.shared.0.lock().unwrap())
    }
}

pub(crate) struct AgentTestFixture {
    pub(crate) agent: Agent,
    pub(crate) handle: AgentHandle,
    pub(crate) engine_state: Arc<Mutex<MockEngineState>>,
    pub(crate) messaging: Arc<PooledCommandQueue>,
    pub(crate) incoming_publishes: Arc<Mutex<Vec<PublishPacket>>>,
}

pub(crate) fn build_agent_test_fixture(max_outstanding_acks: usize) -> AgentTestFixture {
    build_agent_test_fixture_with_queue(max_outstanding_acks, 16, 16)
}

pub(crate) fn build_agent_test_fixture_with_queue(max_outstanding_acks: usize, queue_capacity: usize, pool_capacity: usize) -> AgentTestFixture {
    let (engine, engine_state) = MockEngine::new();
    let messaging = Arc::new(PooledCommandQueue::new(queue_capacity, pool_capacity));
    let incoming_publishes : Arc<Mutex<Vec<PublishPacket>>> = Arc::new(Mutex::new(Vec::new()));

    let options = AgentOptions::builder()
        .with_max_outstanding_acks(max_outstanding_acks)
        .with_event_queue_wait(Duration::from_millis(10))
        .build();

    let sink_target = incoming_publishes.clone();
    let agent = Agent::new(
        options,
        Box::new(engine),
        messaging.clone(),
        Some(Box::new(move |publish| {
            sink_target.lock().unwrap().push(publish);
        })));

    let handle = agent.handle();

    AgentTestFixture {
        agent,
        handle,
        engine_state,
        messaging,
        incoming_publishes,
    }
}

impl AgentTestFixture {

    // One worker-loop iteration, driven synchronously from the test thread: dispatch the
    // next queued command if there is one, otherwise give the engine a service cycle.
    pub(crate) fn drive_one_iteration(&mut self) -> BasaltResult<()> {
        match self.messaging.receive(Duration::ZERO) {
            Some(command) => { self.agent.dispatch_command(command) }
            None => { self.agent.dispatch_process_loop() }
        }
    }

    // Drains the queue, then runs one idle cycle so freshly synthesized acks get routed.
    pub(crate) fn drive_until_idle(&mut self) -> BasaltResult<()> {
        loop {
            let command = self.messaging.receive(Duration::ZERO);
            match command {
                Some(command) => { self.agent.dispatch_command(command)?; }
                None => { break; }
            }
        }

        self.agent.dispatch_process_loop()
    }

    pub(crate) fn make_qos1_publish(&self, topic: &str) -> PublishPacket {
        PublishPacket {
            topic: topic.to_string(),
            qos: QualityOfService::AtLeastOnce,
            payload: Some("payload".as_bytes().to_vec()),
            ..Default::default()
        }
    }

    pub(crate) fn make_subscribe(&self, filter: &str) -> SubscribePacket {
        SubscribePacket {
            subscriptions: vec!(Subscription::new(filter, QualityOfService::AtLeastOnce)),
            ..Default::default()
        }
    }
}
