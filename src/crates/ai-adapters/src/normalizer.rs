//! Maps decoded frames onto [`StreamEvent`]s.
//!
//! Unknown event names, malformed payloads and deltas missing `model` or
//! `delta.text` are dropped here so one bad frame never stalls the stream.

use crate::sse::Frame;
use crate::types::gateway::{
    is_recognized_event, ConsensusOutput, ResponseDelta, RouteLifecycle, EVENT_CONSENSUS,
    EVENT_RESPONSE_COMPLETED, EVENT_RESPONSE_CREATED, EVENT_RESPONSE_DELTA,
};
use log::{debug, warn};
use multichat_core_types::StreamEvent;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn normalize_frame(frame: &Frame) -> Option<StreamEvent> {
    if !is_recognized_event(&frame.event) {
        debug!("Ignoring unrecognized gateway event: {}", frame.event);
        return None;
    }

    let payload: Value = match serde_json::from_str(&frame.data) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(
                "Dropping malformed gateway frame: event={}, error={}, data={}",
                frame.event, e, frame.data
            );
            return None;
        }
    };

    normalize_event(&frame.event, payload)
}

pub fn normalize_event(event_name: &str, payload: Value) -> Option<StreamEvent> {
    match event_name {
        EVENT_RESPONSE_CREATED => {
            decode::<RouteLifecycle>(event_name, payload).and_then(RouteLifecycle::into_created)
        }
        EVENT_RESPONSE_DELTA => {
            let delta = decode::<ResponseDelta>(event_name, payload)?;
            match StreamEvent::try_from(delta) {
                Ok(event) => Some(event),
                Err(reason) => {
                    debug!("Skipping empty delta: {}", reason);
                    None
                }
            }
        }
        EVENT_RESPONSE_COMPLETED => {
            decode::<RouteLifecycle>(event_name, payload).and_then(RouteLifecycle::into_completed)
        }
        EVENT_CONSENSUS => match payload {
            Value::String(text) => Some(StreamEvent::Consensus { text }),
            payload => decode::<ConsensusOutput>(event_name, payload).map(StreamEvent::from),
        },
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(event_name: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(
                "Dropping gateway event with unexpected payload shape: event={}, error={}",
                event_name, e
            );
            None
        }
    }
}
