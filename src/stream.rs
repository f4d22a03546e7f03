//! The stream orchestrator: wires [`crate::resampler::Resampler`], a
//! [`crate::model::SpeechModel`], and [`crate::frame_processor::FrameProcessor`]
//! together behind the small operation set callers actually need. Grounded
//! on `audio_processor.rs::AudioProcessor` (accumulate → run VAD → emit
//! segment), generalized from its mpsc-channel/manual-mode specifics into
//! a synchronous-call orchestrator a caller drives directly.

use crate::config::Config;
use crate::error::VadError;
use crate::event::{Event, EventSink};
use crate::frame_processor::FrameProcessor;
use crate::model::SpeechModel;
use crate::resampler::Resampler;

/// Running counters, generalized from sonori's ad hoc `TranscriptionStats`
/// drop-counting into one struct owned by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VadStats {
    pub frames_processed: u64,
    pub segments_emitted: u64,
    pub misfires: u64,
    pub inference_errors: u64,
}

/// Drives a [`SpeechModel`] over resampled, framed audio and emits
/// [`Event`]s through a caller-supplied [`EventSink`].
pub struct StreamVad {
    model: Box<dyn SpeechModel>,
    resampler: Resampler,
    processor: FrameProcessor,
    stats: VadStats,
    destroyed: bool,
}

impl StreamVad {
    /// Validates `config` against itself and against `model`'s self-reported
    /// frame size before constructing anything stateful (mirrors sonori's
    /// practice of validating before building a heavyweight `ort::Session`).
    pub fn new(
        config: Config,
        model: Box<dyn SpeechModel>,
        native_sample_rate: u32,
    ) -> Result<Self, VadError> {
        config.validate()?;
        config.validate_against_model(model.frame_samples())?;

        let resampler = Resampler::new(native_sample_rate, config.frame_samples);
        let processor = FrameProcessor::new(config);

        Ok(Self {
            model,
            resampler,
            processor,
            stats: VadStats::default(),
            destroyed: false,
        })
    }

    pub fn stats(&self) -> VadStats {
        self.stats
    }

    /// Resets model inference state and moves the frame processor from
    /// `Idle` into `Silence`, ready to receive audio.
    pub fn start(&mut self) -> Result<(), VadError> {
        self.ensure_alive()?;
        self.model.reset_state();
        self.processor.resume();
        log::debug!("StreamVad started");
        Ok(())
    }

    /// Alias for [`Self::start`] used when resuming after a prior `pause`.
    pub fn resume(&mut self) -> Result<(), VadError> {
        self.start()
    }

    /// Stops accepting frames and returns to `Idle`, emitting a terminal
    /// event for any in-progress segment per `FrameProcessor::pause`'s rules.
    pub fn pause(&mut self, sink: &mut dyn EventSink) -> Result<(), VadError> {
        self.ensure_alive()?;
        if let Some(event) = self.processor.pause() {
            self.record(&event);
            sink.on_event(event);
        }
        log::debug!("StreamVad paused");
        Ok(())
    }

    /// Resamples and frames `audio`, running each resulting frame through the
    /// model and the frame processor in order, dispatching every event to
    /// `sink`. A model-inference failure drops only the offending frame: it
    /// is logged, counted, and processing continues with segment state
    /// intact (spec §7 — inference failures must not poison the
    /// orchestrator).
    pub async fn process_audio(
        &mut self,
        audio: &[f32],
        sink: &mut dyn EventSink,
    ) -> Result<(), VadError> {
        self.ensure_alive()?;

        let frames = self.resampler.process(audio);
        for frame in frames {
            let probs = match self.model.process(&frame).await {
                Ok(probs) => probs,
                Err(err) => {
                    log::warn!("model inference failed, dropping frame: {err}");
                    self.stats.inference_errors += 1;
                    continue;
                }
            };

            self.stats.frames_processed += 1;

            if let Some(events) = self.processor.process(frame, probs) {
                for event in events {
                    self.record(&event);
                    sink.on_event(event);
                }
            }
        }

        Ok(())
    }

    /// Zero-pads any partial residual frame left in the resampler up to
    /// `frame_samples` and runs it through the model once (a known, deliberate
    /// approximation that can bias the model toward silence — not "fixed"
    /// into asymmetric behavior), then ends the current segment without
    /// leaving `Idle` (e.g. on end-of-input), returning to `Silence` so
    /// further audio can still be processed.
    pub async fn flush(&mut self, sink: &mut dyn EventSink) -> Result<(), VadError> {
        self.ensure_alive()?;

        if let Some(frame) = self.resampler.drain_residual_padded() {
            match self.model.process(&frame).await {
                Ok(probs) => {
                    self.stats.frames_processed += 1;
                    if let Some(events) = self.processor.process(frame, probs) {
                        for event in events {
                            self.record(&event);
                            sink.on_event(event);
                        }
                    }
                }
                Err(err) => {
                    log::warn!("model inference failed on zero-padded flush frame: {err}");
                    self.stats.inference_errors += 1;
                }
            }
        }

        if let Some(event) = self.processor.end_segment() {
            self.record(&event);
            sink.on_event(event);
        }
        Ok(())
    }

    /// Discards all in-progress segment/pre-roll state and model inference
    /// state without destroying the instance; counters in `stats()` are left
    /// untouched, since they describe the instance's lifetime, not its
    /// current segment.
    pub fn reset(&mut self) -> Result<(), VadError> {
        self.ensure_alive()?;
        self.model.reset_state();
        self.processor.resume();
        log::debug!("StreamVad reset");
        Ok(())
    }

    /// Permanently disables the instance; every other method after this
    /// returns `VadError::Destroyed`.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn ensure_alive(&self) -> Result<(), VadError> {
        if self.destroyed {
            Err(VadError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn record(&mut self, event: &Event) {
        match event {
            Event::SpeechEnd { .. } => self.stats.segments_emitted += 1,
            Event::VadMisfire => self.stats.misfires += 1,
            _ => {}
        }
    }
}
