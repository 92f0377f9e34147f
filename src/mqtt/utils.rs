/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing miscellaneous constants and conversion functions related to the MQTT
specification.
 */

use crate::error::{BasaltError, BasaltResult};
use crate::mqtt::*;

use log::error;

/// Converts a u8 to a quality of service enum value, failing if the value is out of range
pub fn convert_u8_to_quality_of_service(value: u8) -> BasaltResult<QualityOfService> {
    match value {
        0 => { Ok(QualityOfService::AtMostOnce) }
        1 => { Ok(QualityOfService::AtLeastOnce) }
        2 => { Ok(QualityOfService::ExactlyOnce) }
        _ => {
            error!("convert_u8_to_quality_of_service - invalid quality of service value ({})", value);
            Err(BasaltError::new_command_validation("invalid quality of service value"))
        }
    }
}

/// Converts a u8 to a CONNACK return code enum value, failing if the value is out of range
pub fn convert_u8_to_connect_return_code(value: u8) -> BasaltResult<ConnectReturnCode> {
    match value {
        0 => { Ok(ConnectReturnCode::Accepted) }
        1 => { Ok(ConnectReturnCode::UnacceptableProtocolVersion) }
        2 => { Ok(ConnectReturnCode::IdentifierRejected) }
        3 => { Ok(ConnectReturnCode::ServerUnavailable) }
        4 => { Ok(ConnectReturnCode::BadUsernameOrPassword) }
        5 => { Ok(ConnectReturnCode::NotAuthorized) }
        _ => {
            error!("convert_u8_to_connect_return_code - invalid connect return code ({})", value);
            Err(BasaltError::new_protocol_error("invalid connack return code"))
        }
    }
}

/// Converts a u8 to a SUBACK return code enum value, failing if the value is out of range
pub fn convert_u8_to_suback_return_code(value: u8) -> BasaltResult<SubackReturnCode> {
    match value {
        0 => { Ok(SubackReturnCode::SuccessQos0) }
        1 => { Ok(SubackReturnCode::SuccessQos1) }
        2 => { Ok(SubackReturnCode::SuccessQos2) }
        128 => { Ok(SubackReturnCode::Failure) }
        _ => {
            error!("convert_u8_to_suback_return_code - invalid suback return code ({})", value);
            Err(BasaltError::new_protocol_error("invalid suback return code"))
        }
    }
}

pub(crate) fn quality_of_service_to_str(qos: QualityOfService) -> &'static str {
    match qos {
        QualityOfService::AtMostOnce => { "AtMostOnce" }
        QualityOfService::AtLeastOnce => { "AtLeastOnce" }
        QualityOfService::ExactlyOnce => { "ExactlyOnce" }
    }
}

pub(crate) fn connect_return_code_to_str(return_code: ConnectReturnCode) -> &'static str {
    match return_code {
        ConnectReturnCode::Accepted => { "Accepted" }
        ConnectReturnCode::UnacceptableProtocolVersion => { "UnacceptableProtocolVersion" }
        ConnectReturnCode::IdentifierRejected => { "IdentifierRejected" }
        ConnectReturnCode::ServerUnavailable => { "ServerUnavailable" }
        ConnectReturnCode::BadUsernameOrPassword => { "BadUsernameOrPassword" }
        ConnectReturnCode::NotAuthorized => { "NotAuthorized" }
    }
}

pub(crate) fn suback_return_code_to_str(return_code: SubackReturnCode) -> &'static str {
    match return_code {
        SubackReturnCode::SuccessQos0 => { "SuccessQos0" }
        SubackReturnCode::SuccessQos1 => { "SuccessQos1" }
        SubackReturnCode::SuccessQos2 => { "SuccessQos2" }
        SubackReturnCode::Failure => { "Failure" }
    }
}
