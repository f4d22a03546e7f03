use thiserror::Error;

/// Fatal at construction time: invalid thresholds, frame counts, or sample rate.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("positive/negative speech thresholds must satisfy 0 < negative < positive <= 1")]
    InvalidThresholds,
    #[error("frameSamples must be > 0")]
    InvalidFrameSamples,
    #[error("sampleRate must be > 0")]
    InvalidSampleRate,
    #[error("frameSamples {got} is incompatible with the loaded model, which expects {expected}")]
    FrameSamplesMismatch { expected: usize, got: usize },
}

/// Failures from the externally supplied tensor runtime / model session.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to decode model bytes or create session: {0}")]
    Load(#[source] ort::Error),
    #[error("inference failed: {0}")]
    Inference(#[source] ort::Error),
    #[error("model output had shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: &'static str,
        got: Vec<usize>,
    },
}

/// Top-level error surface for the crate.
#[derive(Debug, Error)]
pub enum VadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("operation attempted on a destroyed StreamVad instance")]
    Destroyed,
}

pub type Result<T> = std::result::Result<T, VadError>;
