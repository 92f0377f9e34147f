/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
A module containing the core crate error enumeration, context structures, and conversion
definitions.
 */

use std::error::Error;
use std::fmt;

/// Additional details about a CommandValidation error variant
#[derive(Debug)]
pub struct CommandValidationContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an AllocationFailure error variant
#[derive(Debug)]
pub struct AllocationFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a SubmissionFailure error variant
#[derive(Debug)]
pub struct SubmissionFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an Interrupted error variant
#[derive(Debug)]
pub struct InterruptedContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an InternalStateError error variant
#[derive(Debug)]
pub struct InternalStateErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ProtocolError error variant
#[derive(Debug)]
pub struct ProtocolErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ConnectionRejected error variant
#[derive(Debug)]
pub struct ConnectionRejectedContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ConnectionClosed error variant
#[derive(Debug)]
pub struct ConnectionClosedContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Basic error type for the entire basalt-mqtt crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum BasaltError {

    /// Error emitted when a submitted command is rejected before a record is even allocated
    /// because its parameters violate the MQTT specification or the agent's contract.
    CommandValidation(CommandValidationContext),

    /// Error emitted when a fixed-capacity resource is exhausted.  This covers both the
    /// command record pool on the submission path and the pending-acknowledgment table on
    /// the dispatch path.  No state is mutated when this error is returned.
    AllocationFailure(AllocationFailureContext),

    /// Error emitted when the messaging interface refuses to accept a populated command
    /// record.  The record has already been released by the time the caller sees this.
    SubmissionFailure(SubmissionFailureContext),

    /// Error applied to commands that are abandoned before their acknowledgment arrives.
    /// Emitted by cancel-all, terminate, and clean-session resumption.
    Interrupted(InterruptedContext),

    /// Error emitted when the protocol engine refuses an operation because its internal
    /// state does not permit it, or when the agent reaches a state that should be
    /// impossible.  For a single command this is a command-level failure; the worker loop
    /// keeps running.
    InternalStateError(InternalStateErrorContext),

    /// Error emitted when broker behavior violates the MQTT specification in a way that
    /// cannot be safely ignored.  Halts the worker loop.
    ProtocolError(ProtocolErrorContext),

    /// Error emitted when the broker explicitly refuses a connection attempt with a failing
    /// CONNACK return code.
    ConnectionRejected(ConnectionRejectedContext),

    /// Error emitted when the transport underneath the protocol engine fails or the broker
    /// hangs up.  Halts the worker loop; the caller is expected to reconnect and resume the
    /// session.
    ConnectionClosed(ConnectionClosedContext),
}

impl BasaltError {

    /// Constructs a new CommandValidation variant from an existing error or message.
    pub fn new_command_validation(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::CommandValidation(
            CommandValidationContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new AllocationFailure variant from an existing error or message.
    pub fn new_allocation_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::AllocationFailure(
            AllocationFailureContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new SubmissionFailure variant from an existing error or message.
    pub fn new_submission_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::SubmissionFailure(
            SubmissionFailureContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new Interrupted variant from an existing error or message.
    pub fn new_interrupted(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::Interrupted(
            InterruptedContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new InternalStateError variant from an existing error or message.
    pub fn new_internal_state_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::InternalStateError(
            InternalStateErrorContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new ProtocolError variant from an existing error or message.  Typically
    /// constructed by protocol engine implementations.
    pub fn new_protocol_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::ProtocolError(
            ProtocolErrorContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new ConnectionRejected variant from an existing error or message.
    /// Typically constructed by protocol engine implementations.
    pub fn new_connection_rejected(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::ConnectionRejected(
            ConnectionRejectedContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new ConnectionClosed variant from an existing error or message.
    /// Typically constructed by protocol engine implementations.
    pub fn new_connection_closed(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        BasaltError::ConnectionClosed(
            ConnectionClosedContext {
                source : source.into()
            }
        )
    }

    /// Returns whether or not this error indicates the MQTT session underneath the agent is
    /// broken.  Session-fatal errors abort the worker loop; everything else fails only the
    /// command that triggered it.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, BasaltError::ConnectionClosed(_) | BasaltError::ProtocolError(_))
    }
}

impl Error for BasaltError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BasaltError::CommandValidation(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::AllocationFailure(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::SubmissionFailure(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::Interrupted(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::InternalStateError(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::ProtocolError(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::ConnectionRejected(context) => {
                Some(context.source.as_ref())
            }
            BasaltError::ConnectionClosed(context) => {
                Some(context.source.as_ref())
            }
        }
    }
}

impl fmt::Display for BasaltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasaltError::CommandValidation(_) => {
                write!(f, "command parameters violate the mqtt spec or the agent contract")
            }
            BasaltError::AllocationFailure(_) => {
                write!(f, "a fixed-capacity agent resource is exhausted; source contains further details")
            }
            BasaltError::SubmissionFailure(_) => {
                write!(f, "the messaging interface refused to accept a command record")
            }
            BasaltError::Interrupted(_) => {
                write!(f, "the command was abandoned before its acknowledgment arrived")
            }
            BasaltError::InternalStateError(_) => {
                write!(f, "the protocol engine or agent reached an invalid internal state; source contains further details")
            }
            BasaltError::ProtocolError(_) => {
                write!(f, "broker behavior disallowed by the mqtt spec")
            }
            BasaltError::ConnectionRejected(_) => {
                write!(f, "the broker explicitly rejected the connection attempt")
            }
            BasaltError::ConnectionClosed(_) => {
                write!(f, "the connection underneath the protocol engine was closed; source contains further details")
            }
        }
    }
}

/// Crate-wide result type for functions that can fail
pub type BasaltResult<T> = Result<T, BasaltError>;
