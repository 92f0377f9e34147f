/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing a set of structured data types that model the slice of the MQTT 3.1.1
specification that crosses the agent's interfaces.

Wire-level encoding and decoding of these types is the protocol engine's concern; the agent
only moves them between producers, the worker, and the engine.
 */

pub mod utils;

use crate::error::BasaltError;

/// MQTT message delivery quality of service.
///
/// Enum values match [MQTT 3.1.1 spec](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718099) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum QualityOfService {

    /// The message is delivered according to the capabilities of the underlying network. No response is sent by the
    /// receiver and no retry is performed by the sender. The message arrives at the receiver either once or not at all.
    #[default]
    AtMostOnce = 0,

    /// A level of service that ensures that the message arrives at the receiver at least once.
    AtLeastOnce = 1,

    /// A level of service that ensures that the message arrives at the receiver exactly once.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QualityOfService {
    type Error = BasaltError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_quality_of_service(value)
    }
}

/// Server return code for connection attempts.
///
/// Enum values match [MQTT 3.1.1 spec](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718035) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectReturnCode {

    /// Returned when the connection is accepted.
    #[default]
    Accepted = 0,

    /// Returned when the server does not support the protocol level requested by the client.
    UnacceptableProtocolVersion = 1,

    /// Returned when the client identifier is correctly formed but not allowed by the server.
    IdentifierRejected = 2,

    /// Returned when the network connection has been made but the MQTT service is unavailable.
    ServerUnavailable = 3,

    /// Returned when the data in the user name or password is malformed.
    BadUsernameOrPassword = 4,

    /// Returned when the client is not authorized to connect.
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    /// Returns whether or not the return code represents a successful connection attempt
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectReturnCode::Accepted)
    }
}

/// Per-filter return code inside SUBACK packets that indicates the result of the associated
/// subscription request.
///
/// Enum values match [MQTT 3.1.1 spec](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718071) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubackReturnCode {

    /// Returned when the subscription was accepted at a maximum quality of service of 0.
    #[default]
    SuccessQos0 = 0,

    /// Returned when the subscription was accepted at a maximum quality of service of 1.
    SuccessQos1 = 1,

    /// Returned when the subscription was accepted at a maximum quality of service of 2.
    SuccessQos2 = 2,

    /// Returned when the server refused the subscription.
    Failure = 128,
}

impl SubackReturnCode {
    /// Returns whether or not the return code represents a granted subscription
    pub fn is_success(&self) -> bool {
        !matches!(self, SubackReturnCode::Failure)
    }
}

/// Data model of an [MQTT 3.1.1 PUBLISH](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718037) packet.
///
/// Used both for outbound publishes submitted by producers and for incoming publishes routed
/// to the agent's incoming-publish sink.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PublishPacket {

    /// Packet identifier.  Zero until the agent binds one at dispatch time; zero forever for
    /// QoS 0 publishes.
    pub packet_id: u16,

    /// Sent publishes - the topic this message should be published to.
    ///
    /// Received publishes - the topic this message was published to.
    pub topic: String,

    /// Sent publishes - the MQTT quality of service level this message should be delivered with.
    ///
    /// Received publishes - the MQTT quality of service level this message was delivered at.
    pub qos: QualityOfService,

    /// Indicates to the recipient that this packet is a resend of a previous attempt.  Managed
    /// by the agent during session resumption; producers should leave it false.
    pub duplicate: bool,

    /// True if this is a retained message.
    pub retain: bool,

    /// The payload of the publish message.
    pub payload: Option<Vec<u8>>,
}

/// Specifies a single subscription within a Subscribe operation
///
/// See [MQTT 3.1.1 Subscribe](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718063)
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Subscription {

    /// Topic filter to subscribe to
    pub topic_filter: String,

    /// Maximum QoS on which the subscriber will accept publish messages.  Negotiated against
    /// the granted QoS in the corresponding SUBACK return code.
    pub qos: QualityOfService,
}

impl Subscription {
    /// Creates a new subscription
    pub fn new(topic_filter: &str, qos: QualityOfService) -> Self {
        Subscription {
            topic_filter: topic_filter.to_string(),
            qos
        }
    }
}

/// Data model of an [MQTT 3.1.1 SUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718063) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscribePacket {

    /// Packet identifier.  Bound by the agent at dispatch time.
    pub packet_id: u16,

    /// List of topic filter subscriptions that the client wishes to listen to
    pub subscriptions: Vec<Subscription>,
}

/// Data model of an [MQTT 3.1.1 UNSUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718072) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnsubscribePacket {

    /// Packet identifier.  Bound by the agent at dispatch time.
    pub packet_id: u16,

    /// List of topic filters that the client wishes to unsubscribe from.
    pub topic_filters: Vec<String>,
}

/// Data model of an [MQTT 3.1.1 CONNACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718033) packet.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConnackPacket {

    /// True if the broker is resuming a session it retained for this client id, in which case
    /// unacknowledged QoS 1+ state survives the reconnect.  The caller feeds this flag into
    /// session resumption.
    pub session_present: bool,

    /// Result of the connection attempt.
    pub return_code: ConnectReturnCode,
}

/// Data model of an [MQTT 3.1.1 SUBACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718068) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubackPacket {

    /// Packet identifier of the SUBSCRIBE this packet acknowledges.
    pub packet_id: u16,

    /// A return code for each subscription in the associated SUBSCRIBE, in order.
    pub return_codes: Vec<SubackReturnCode>,
}

/// Data model of an [MQTT 3.1.1 UNSUBACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718077) packet.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UnsubackPacket {

    /// Packet identifier of the UNSUBSCRIBE this packet acknowledges.
    pub packet_id: u16,
}
