//! # Simulator messages
//!
//! Decoding of inbound frames from the simulator and the definitions of the events exchanged with
//! it.
//!
//! Inbound frames are decoded structurally: the body after the event prefix is parsed as a JSON
//! array, the first element names the event and the second is its payload. A payload which is
//! absent or JSON `null` means the simulator is in manual mode and only wants the
//! [`MANUAL_REPLY`] acknowledgement.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod steer;
mod telemetry;

pub use steer::SteerCommand;
pub use telemetry::Telemetry;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde_json::Value;

use crate::net::strip_event_prefix;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Reply sent when a frame carries no payload.
pub const MANUAL_REPLY: &str = "42[\"manual\",{}]";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound steering event.
pub const STEER_EVENT: &str = "steer";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The frame does not carry an event and should be ignored.
    NotAnEvent,

    /// The event carried no payload, the simulator is being driven manually.
    Manual,

    /// Telemetry from the vehicle.
    Telemetry(Telemetry),

    /// An event this software does not handle.
    Unknown(String),
}

/// Errors which occur while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Frame body is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Expected the frame body to be a JSON array, found: {0}")]
    NotAnArray(String),

    #[error("Expected the first element of the frame to be an event name, found: {0}")]
    BadEventName(String),

    #[error("Telemetry payload is malformed: {0}")]
    InvalidTelemetry(serde_json::Error),

    #[error("Waypoint sequences differ in length (ptsx: {ptsx}, ptsy: {ptsy})")]
    WaypointLengthMismatch { ptsx: usize, ptsy: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Decode a frame received from the simulator.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let body = match strip_event_prefix(frame) {
            Some(b) => b,
            None => return Ok(Frame::NotAnEvent),
        };

        let value: Value = serde_json::from_str(body).map_err(ProtocolError::InvalidJson)?;

        let mut elements = match value {
            Value::Array(a) => a.into_iter(),
            other => return Err(ProtocolError::NotAnArray(other.to_string())),
        };

        let event = match elements.next() {
            Some(Value::String(s)) => s,
            Some(other) => return Err(ProtocolError::BadEventName(other.to_string())),
            None => return Err(ProtocolError::BadEventName(String::from("<empty array>"))),
        };

        let payload = match elements.next() {
            None | Some(Value::Null) => return Ok(Frame::Manual),
            Some(p) => p,
        };

        if event != TELEMETRY_EVENT {
            return Ok(Frame::Unknown(event));
        }

        let telemetry: Telemetry =
            serde_json::from_value(payload).map_err(ProtocolError::InvalidTelemetry)?;
        telemetry.validate()?;

        Ok(Frame::Telemetry(telemetry))
    }
}
