/// Speech probability pair produced by a [`crate::model::SpeechModel`] for a single frame.
///
/// Callers must treat both fields as opaque signals; only `is_speech` drives
/// the state machine (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechProbabilities {
    pub is_speech: f32,
    pub not_speech: f32,
}

/// One output of [`crate::frame_processor::FrameProcessor::process`].
///
/// At most one of the speech-transition variants is emitted per input frame,
/// alongside the always-emitted `FrameProcessed` (spec §4.2 invariant 4).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Emitted once per `process()` call regardless of state.
    FrameProcessed {
        probs: SpeechProbabilities,
        frame: Vec<f32>,
    },
    /// `isSpeech` crossed the positive threshold; a segment has started accumulating.
    SpeechStart,
    /// `min_speech_frames` has been reached; the segment is confirmed, not a misfire candidate.
    SpeechRealStart,
    /// The segment ended cleanly with `speech_frames_in_segment >= min_speech_frames`.
    SpeechEnd { audio: Vec<f32> },
    /// A speech-start never accumulated enough speech frames; the segment is discarded.
    VadMisfire,
}

impl Event {
    pub fn is_speech_start(&self) -> bool {
        matches!(self, Event::SpeechStart)
    }
}

/// Caller-supplied sink for events emitted by a [`crate::stream::StreamVad`].
///
/// An alternative to threading events back through return values when a
/// caller wants push-based delivery (spec §9: "callback-centric events").
/// Implementations must not panic; a panicking sink is the caller's bug to
/// fix, not this crate's to recover from (spec §7).
pub trait EventSink {
    fn on_event(&mut self, event: Event);
}

impl<F: FnMut(Event)> EventSink for F {
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}

/// Convenience sink for tests and simple callers that just want to collect
/// every emitted event in order.
impl EventSink for Vec<Event> {
    fn on_event(&mut self, event: Event) {
        self.push(event)
    }
}
