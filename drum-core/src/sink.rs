//! Result delivery.
//!
//! The engine hands every event to an [`EventSink`] passed into
//! [`StrikeEngine::process_block`](crate::StrikeEngine::process_block), on the
//! caller's thread, in the order the events were produced. Sinks must not
//! block: they run inside the audio processing path.

use crossbeam_channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::{AmplitudeSample, AnalysisResult};

/// Everything the engine publishes.
///
/// Serializes as `{ "type": "analysis" | "amplitude", "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum EngineEvent {
    Analysis(AnalysisResult),
    Amplitude(AmplitudeSample),
}

pub trait EventSink {
    fn publish(&mut self, event: EngineEvent);
}

/// Collects events in memory. Mostly useful for offline runs and tests.
impl EventSink for Vec<EngineEvent> {
    fn publish(&mut self, event: EngineEvent) {
        self.push(event);
    }
}

/// Forwards events to another thread. Never blocks: when a bounded channel is
/// full the event is dropped.
impl EventSink for Sender<EngineEvent> {
    fn publish(&mut self, event: EngineEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::debug!("event queue full, dropping event"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Adapts a closure into a sink.
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(EngineEvent)> EventSink for CallbackSink<F> {
    fn publish(&mut self, event: EngineEvent) {
        (self.0)(event)
    }
}
