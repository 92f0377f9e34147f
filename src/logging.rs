/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::config::ConnectOptions;
use crate::mqtt::*;
use crate::mqtt::utils::*;

use std::fmt;

macro_rules! log_primitive_value {
    ($integral_value: expr, $formatter: expr, $log_field: expr) => {
        write!($formatter, " {}:{}", $log_field, $integral_value)?;
    };
}

macro_rules! log_string {
    ($value: expr, $formatter: expr, $log_field: expr) => {
        write!($formatter, " {}:\"{}\"", $log_field, $value)?;
    };
}

macro_rules! log_optional_string {
    ($optional_string: expr, $formatter: expr, $log_field: expr, $value:ident) => {
        if let Some($value) = &$optional_string {
            write!($formatter, " {}:\"{}\"", $log_field, $value)?;
        }
    };
}

macro_rules! log_enum {
    ($enum_value: expr, $formatter: expr, $log_field: expr, $converter: expr) => {
        write!($formatter, " {}:{}", $log_field, $converter($enum_value))?;
    };
}

macro_rules! log_optional_binary_data {
    ($optional_data: expr, $formatter: expr, $log_field: expr, $value:ident) => {
        if let Some($value) = &$optional_data {
            write!($formatter, " {}:<{} Bytes>",  $log_field, $value.len())?;
        }
    };
}

macro_rules! log_optional_binary_data_sensitive {
    ($optional_data: expr, $formatter: expr, $log_field: expr) => {
        if let Some(_) = &$optional_data {
            write!($formatter, " {}:<...redacted>", $log_field)?;
        }
    };
}

impl fmt::Display for PublishPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublishPacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        log_string!(self.topic, f, "topic");
        log_enum!(self.qos, f, "qos", quality_of_service_to_str);
        log_primitive_value!(self.duplicate, f, "duplicate");
        log_primitive_value!(self.retain, f, "retain");
        log_optional_binary_data!(self.payload, f, "payload", value);
        write!(f, " }}")
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        log_string!(self.topic_filter, f, "topic_filter");
        log_enum!(self.qos, f, "qos", quality_of_service_to_str);
        write!(f, " }}")
    }
}

impl fmt::Display for SubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubscribePacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " subscriptions: [")?;
        for subscription in &self.subscriptions {
            write!(f, " {}", subscription)?;
        }
        write!(f, " ] }}")
    }
}

impl fmt::Display for UnsubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnsubscribePacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " topic_filters: [")?;
        for filter in &self.topic_filters {
            write!(f, " \"{}\"", filter)?;
        }
        write!(f, " ] }}")
    }
}

impl fmt::Display for ConnackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnackPacket {{")?;
        log_primitive_value!(self.session_present, f, "session_present");
        log_enum!(self.return_code, f, "return_code", connect_return_code_to_str);
        write!(f, " }}")
    }
}

impl fmt::Display for SubackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubackPacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " return_codes: [")?;
        for return_code in &self.return_codes {
            write!(f, " {}", suback_return_code_to_str(*return_code))?;
        }
        write!(f, " ] }}")
    }
}

impl fmt::Display for UnsubackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnsubackPacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " }}")
    }
}

impl fmt::Display for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnectOptions {{")?;
        log_optional_string!(self.client_id, f, "client_id", value);
        log_primitive_value!(self.clean_session, f, "clean_session");
        if let Some(keep_alive) = &self.keep_alive_interval_seconds {
            write!(f, " keep_alive_interval_seconds:{}", keep_alive)?;
        }
        log_optional_string!(self.username, f, "username", value);
        log_optional_binary_data_sensitive!(self.password, f, "password");
        if let Some(will) = &self.will {
            write!(f, " will:{}", will)?;
        }
        write!(f, " }}")
    }
}
