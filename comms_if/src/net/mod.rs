//! # Network Module
//!
//! The simulator talks over a text channel where every event-carrying frame is the two character
//! prefix `42` followed by a JSON array `[event_name, payload]`. The `4` marks a message and the
//! `2` an event. This module provides the framing of those events and the network parameters of
//! the server.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix which marks a frame as carrying an event.
pub const EVENT_PREFIX: &str = "42";

/// Default port the simulator connects to.
pub const DEFAULT_PORT: u16 = 4567;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Address the server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the server listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetParams {
    /// The `address:port` string to bind the listener to.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: DEFAULT_PORT,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Strip the event prefix from a frame.
///
/// Returns `None` if the frame is not an event frame, i.e. it lacks the prefix or carries nothing
/// after it.
pub fn strip_event_prefix(frame: &str) -> Option<&str> {
    match frame.strip_prefix(EVENT_PREFIX) {
        Some(body) if !body.is_empty() => Some(body),
        _ => None,
    }
}

/// Encode an event with the given name and payload into a frame.
pub fn encode_event<T: Serialize>(name: &str, payload: &T) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}[{},{}]",
        EVENT_PREFIX,
        serde_json::to_string(name)?,
        serde_json::to_string(payload)?
    ))
}

fn default_bind_address() -> String {
    String::from("0.0.0.0")
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_strip_event_prefix() {
        assert_eq!(strip_event_prefix("42[\"a\",{}]"), Some("[\"a\",{}]"));
        assert_eq!(strip_event_prefix("42"), None);
        assert_eq!(strip_event_prefix("2probe"), None);
        assert_eq!(strip_event_prefix("0{\"sid\":1}"), None);
    }

    #[test]
    fn test_encode_event() {
        let frame = encode_event("manual", &serde_json::json!({})).unwrap();
        assert_eq!(frame, "42[\"manual\",{}]");
    }

    #[test]
    fn test_net_params_defaults() {
        let p: NetParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p.endpoint(), "0.0.0.0:4567");
    }
}
