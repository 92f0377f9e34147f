/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing submission-time validation of producer-supplied command parameters.

Everything here runs on the producer thread, before a command record is allocated, so a
rejected submission has no side effects at all.  Connection-bound constraints (broker
maximums, negotiated limits) are the protocol engine's concern, not ours.
 */

use crate::config::ConnectOptions;
use crate::error::{BasaltError, BasaltResult};
use crate::mqtt::*;

use log::error;

pub(crate) const MAXIMUM_STRING_LENGTH : usize = 65535;
pub(crate) const MAXIMUM_BINARY_LENGTH : usize = 65535;

fn validate_string_length(value: &str, packet_name: &str, field_name: &str) -> BasaltResult<()> {
    if value.len() > MAXIMUM_STRING_LENGTH {
        error!("{} validation - {} too long", packet_name, field_name);
        return Err(BasaltError::new_command_validation(format!("{} {} exceeds maximum length", packet_name, field_name)));
    }

    Ok(())
}

// A publish topic must name a single concrete topic; wildcards only have meaning in
// subscription filters.
fn validate_topic(topic: &str, packet_name: &str) -> BasaltResult<()> {
    if topic.is_empty() {
        error!("{} validation - empty topic", packet_name);
        return Err(BasaltError::new_command_validation(format!("{} topic must not be empty", packet_name)));
    }

    validate_string_length(topic, packet_name, "topic")?;

    if topic.contains(['#', '+']) {
        error!("{} validation - topic contains wildcard characters", packet_name);
        return Err(BasaltError::new_command_validation(format!("{} topic must not contain wildcards", packet_name)));
    }

    Ok(())
}

// Filter levels are '+', or '#' in the final position, or a literal with no wildcard
// characters embedded in it.
fn is_valid_topic_filter(filter: &str) -> bool {
    if filter.is_empty() || filter.len() > MAXIMUM_STRING_LENGTH {
        return false;
    }

    let levels : Vec<&str> = filter.split('/').collect();
    for (index, level) in levels.iter().enumerate() {
        match *level {
            "#" => {
                if index + 1 != levels.len() {
                    return false;
                }
            }
            "+" => {}
            literal => {
                if literal.contains(['#', '+']) {
                    return false;
                }
            }
        }
    }

    true
}

fn validate_topic_filter(filter: &str, packet_name: &str) -> BasaltResult<()> {
    if !is_valid_topic_filter(filter) {
        error!("{} validation - invalid topic filter \"{}\"", packet_name, filter);
        return Err(BasaltError::new_command_validation(format!("{} contains an invalid topic filter", packet_name)));
    }

    Ok(())
}

pub(crate) fn validate_publish(publish: &PublishPacket) -> BasaltResult<()> {
    validate_topic(&publish.topic, "PublishPacket")?;

    if let Some(payload) = &publish.payload {
        if payload.len() > MAXIMUM_BINARY_LENGTH {
            error!("PublishPacket validation - payload too large");
            return Err(BasaltError::new_command_validation("PublishPacket payload exceeds maximum length"));
        }
    }

    Ok(())
}

pub(crate) fn validate_subscribe(subscribe: &SubscribePacket) -> BasaltResult<()> {
    if subscribe.subscriptions.is_empty() {
        error!("SubscribePacket validation - empty subscription list");
        return Err(BasaltError::new_command_validation("SubscribePacket must contain at least one subscription"));
    }

    for subscription in &subscribe.subscriptions {
        validate_topic_filter(&subscription.topic_filter, "SubscribePacket")?;
    }

    Ok(())
}

pub(crate) fn validate_unsubscribe(unsubscribe: &UnsubscribePacket) -> BasaltResult<()> {
    if unsubscribe.topic_filters.is_empty() {
        error!("UnsubscribePacket validation - empty topic filter list");
        return Err(BasaltError::new_command_validation("UnsubscribePacket must contain at least one topic filter"));
    }

    for filter in &unsubscribe.topic_filters {
        validate_topic_filter(filter, "UnsubscribePacket")?;
    }

    Ok(())
}

pub(crate) fn validate_connect(options: &ConnectOptions) -> BasaltResult<()> {
    if let Some(client_id) = &options.client_id {
        validate_string_length(client_id, "ConnectOptions", "client_id")?;
    }

    if let Some(username) = &options.username {
        validate_string_length(username, "ConnectOptions", "username")?;
    }

    if let Some(password) = &options.password {
        if password.len() > MAXIMUM_BINARY_LENGTH {
            error!("ConnectOptions validation - password too large");
            return Err(BasaltError::new_command_validation("ConnectOptions password exceeds maximum length"));
        }
    }

    if let Some(will) = &options.will {
        validate_publish(will)?;
    }

    Ok(())
}
