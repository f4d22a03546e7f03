//! Streaming Voice Activity Detection core around Silero-family ONNX models.
//!
//! Pipeline: caller audio chunks → [`resampler::Resampler`] → 16 kHz frames
//! → [`model::SpeechModel`] → [`frame_processor::FrameProcessor`] →
//! [`event::Event`]s, orchestrated end-to-end by [`stream::StreamVad`].

pub mod config;
pub mod error;
pub mod event;
pub mod frame_processor;
pub mod model;
pub mod resampler;
pub mod stream;
pub mod wav;

pub use config::Config;
pub use error::{ConfigError, ModelError, Result, VadError};
pub use event::{Event, EventSink, SpeechProbabilities};
pub use frame_processor::FrameProcessor;
pub use model::{load_silero, SileroLegacy, SileroV5, SpeechModel};
pub use resampler::Resampler;
pub use stream::{StreamVad, VadStats};
