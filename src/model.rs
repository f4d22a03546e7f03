//! The externally supplied neural model the frame processor drives.
//!
//! Grounded on `silero_audio_processor.rs::SileroVad::calc_speech_prob` for
//! the v5 tensor shapes, and on the pack's `vad-silero.rs`
//! (gjovanov-roomler2) for the legacy (v4) `(input, sr, h, c)` signature and
//! the auto-detection-by-input-name trick used in [`load_silero`].

use async_trait::async_trait;
use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use crate::error::ModelError;
use crate::event::SpeechProbabilities;

/// A stateful sequence model consuming one 16 kHz frame at a time.
///
/// `process` must be deterministic given (prior internal state, input
/// frame) and mutates internal state; `reset_state` restores it to t=0
/// (spec §6).
#[async_trait]
pub trait SpeechModel: Send {
    /// The frame size in samples this model instance expects.
    fn frame_samples(&self) -> usize;

    /// Runs inference on one frame, returning the speech/non-speech probabilities.
    async fn process(&mut self, frame: &[f32]) -> Result<SpeechProbabilities, ModelError>;

    /// Restores inference state to t=0.
    fn reset_state(&mut self);
}

const LEGACY_HIDDEN: usize = 64;
const V5_HIDDEN: usize = 128;

/// Silero VAD legacy variant: separate `h`/`c` LSTM states, hidden size 64.
/// Canonical frame sizes are 256/512/768/1024/1536 samples; 1536 is the
/// spec default.
pub struct SileroLegacy {
    session: Session,
    frame_samples: usize,
    sample_rate: i64,
    h: Array3<f32>,
    c: Array3<f32>,
}

impl SileroLegacy {
    pub fn new(
        model_bytes: &[u8],
        frame_samples: usize,
        sample_rate: u32,
    ) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(ModelError::Load)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ModelError::Load)?
            .with_intra_threads(1)
            .map_err(ModelError::Load)?
            .commit_from_memory(model_bytes)
            .map_err(ModelError::Load)?;

        Ok(Self {
            session,
            frame_samples,
            sample_rate: sample_rate as i64,
            h: Array3::zeros((2, 1, LEGACY_HIDDEN)),
            c: Array3::zeros((2, 1, LEGACY_HIDDEN)),
        })
    }

    pub fn from_file(
        model_path: impl AsRef<Path>,
        frame_samples: usize,
        sample_rate: u32,
    ) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(ModelError::Load)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ModelError::Load)?
            .with_intra_threads(1)
            .map_err(ModelError::Load)?
            .commit_from_file(model_path)
            .map_err(ModelError::Load)?;

        Ok(Self {
            session,
            frame_samples,
            sample_rate: sample_rate as i64,
            h: Array3::zeros((2, 1, LEGACY_HIDDEN)),
            c: Array3::zeros((2, 1, LEGACY_HIDDEN)),
        })
    }
}

#[async_trait]
impl SpeechModel for SileroLegacy {
    fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    async fn process(&mut self, frame: &[f32]) -> Result<SpeechProbabilities, ModelError> {
        let input = Array2::from_shape_vec((1, frame.len()), frame.to_vec())
            .map_err(|_| ModelError::ShapeMismatch {
                expected: "(1, frame_samples)",
                got: vec![frame.len()],
            })?;
        let input_val = Tensor::from_array(input).map_err(ModelError::Inference)?;
        let sr_val =
            Tensor::from_array(Array1::from_vec(vec![self.sample_rate])).map_err(ModelError::Inference)?;
        let h_val = Tensor::from_array(self.h.clone()).map_err(ModelError::Inference)?;
        let c_val = Tensor::from_array(self.c.clone()).map_err(ModelError::Inference)?;

        let outputs = self
            .session
            .run(ort::inputs![input_val, sr_val, h_val, c_val])
            .map_err(ModelError::Inference)?;

        let (_, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(ModelError::Inference)?;
        let is_speech = output_data.first().copied().unwrap_or(0.0);

        let expected = 2 * LEGACY_HIDDEN;
        if let Ok((_, hn)) = outputs[1].try_extract_tensor::<f32>() {
            if hn.len() == expected {
                self.h = Array3::from_shape_vec((2, 1, LEGACY_HIDDEN), hn.to_vec())
                    .unwrap_or_else(|_| Array3::zeros((2, 1, LEGACY_HIDDEN)));
            }
        }
        if let Ok((_, cn)) = outputs[2].try_extract_tensor::<f32>() {
            if cn.len() == expected {
                self.c = Array3::from_shape_vec((2, 1, LEGACY_HIDDEN), cn.to_vec())
                    .unwrap_or_else(|_| Array3::zeros((2, 1, LEGACY_HIDDEN)));
            }
        }

        Ok(SpeechProbabilities {
            is_speech,
            not_speech: 1.0 - is_speech,
        })
    }

    fn reset_state(&mut self) {
        self.h = Array3::zeros((2, 1, LEGACY_HIDDEN));
        self.c = Array3::zeros((2, 1, LEGACY_HIDDEN));
    }
}

/// Silero VAD v5: a single combined state tensor, hidden size 128, fixed
/// 512-sample frames. Grounded on `silero_audio_processor.rs::SileroVad`.
pub struct SileroV5 {
    session: Session,
    sample_rate: Array1<i64>,
    state: ArrayD<f32>,
}

impl SileroV5 {
    pub fn new(model_bytes: &[u8], sample_rate: u32) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(ModelError::Load)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ModelError::Load)?
            .with_intra_threads(1)
            .map_err(ModelError::Load)?
            .commit_from_memory(model_bytes)
            .map_err(ModelError::Load)?;

        Ok(Self {
            session,
            sample_rate: Array1::from_vec(vec![sample_rate as i64]),
            state: ArrayD::zeros(IxDyn(&[2, 1, V5_HIDDEN])),
        })
    }

    pub fn from_file(model_path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(ModelError::Load)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ModelError::Load)?
            .with_intra_threads(1)
            .map_err(ModelError::Load)?
            .commit_from_file(model_path)
            .map_err(ModelError::Load)?;

        Ok(Self {
            session,
            sample_rate: Array1::from_vec(vec![sample_rate as i64]),
            state: ArrayD::zeros(IxDyn(&[2, 1, V5_HIDDEN])),
        })
    }
}

#[async_trait]
impl SpeechModel for SileroV5 {
    fn frame_samples(&self) -> usize {
        512
    }

    async fn process(&mut self, frame: &[f32]) -> Result<SpeechProbabilities, ModelError> {
        let input = Array2::from_shape_vec((1, frame.len()), frame.to_vec())
            .map_err(|_| ModelError::ShapeMismatch {
                expected: "(1, 512)",
                got: vec![frame.len()],
            })?;
        let input_val = Tensor::from_array(input).map_err(ModelError::Inference)?;
        let state_val =
            Tensor::from_array(self.state.clone()).map_err(ModelError::Inference)?;
        let sr_val = Tensor::from_array(self.sample_rate.clone()).map_err(ModelError::Inference)?;

        let outputs = self
            .session
            .run(ort::inputs![input_val, state_val, sr_val])
            .map_err(ModelError::Inference)?;

        let (_, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(ModelError::Inference)?;
        let is_speech = output_data.first().copied().unwrap_or(0.0);

        let expected = 2 * V5_HIDDEN;
        if let Ok((_, state_data)) = outputs[1].try_extract_tensor::<f32>() {
            if state_data.len() == expected {
                self.state = ArrayD::from_shape_vec(IxDyn(&[2, 1, V5_HIDDEN]), state_data.to_vec())
                    .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[2, 1, V5_HIDDEN])));
            }
        }

        Ok(SpeechProbabilities {
            is_speech,
            not_speech: 1.0 - is_speech,
        })
    }

    fn reset_state(&mut self) {
        self.state = ArrayD::zeros(IxDyn(&[2, 1, V5_HIDDEN]));
    }
}

/// Loads either Silero variant from the same ONNX bytes, detecting which one
/// by probing the session's declared input names (`"state"` present => v5).
/// Grounded on the pack's `vad-silero.rs` `ModelVersion` detection.
pub fn load_silero(
    model_bytes: &[u8],
    frame_samples: usize,
    sample_rate: u32,
) -> Result<Box<dyn SpeechModel>, ModelError> {
    let probe = Session::builder()
        .map_err(ModelError::Load)?
        .commit_from_memory(model_bytes)
        .map_err(ModelError::Load)?;
    let is_v5 = probe.inputs().iter().any(|i| i.name() == "state");
    drop(probe);

    if is_v5 {
        Ok(Box::new(SileroV5::new(model_bytes, sample_rate)?))
    } else {
        Ok(Box::new(SileroLegacy::new(
            model_bytes,
            frame_samples,
            sample_rate,
        )?))
    }
}
