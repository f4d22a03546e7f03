//! Streaming resampler: normalizes an arbitrary native sample rate down to
//! 16 kHz and slices the result into fixed-size frames, lazily, across call
//! boundaries (spec §4.1).
//!
//! Implementation picks the *batch* variant of the two the original source
//! carried (see spec §9's open question): residue is retained explicitly in
//! `pending` and trimmed only as whole output frames are produced, never
//! eagerly. Shape of the streaming-buffer bookkeeping is grounded on the
//! pack's `resampler.rs` (51N74) and ColdVox's `chunker.rs`, which both keep
//! a rolling input tail across `process()` calls.

const TARGET_RATE: u32 = 16_000;

/// Converts `native_rate` Hz input into `target_frame_size`-sample frames at
/// 16 kHz, box-filtering when downsampling and passing through unchanged
/// when `native_rate == 16000`.
pub struct Resampler {
    native_rate: u32,
    target_frame_size: usize,
    input_samples_per_frame: usize,
    pending: Vec<f32>,
}

impl Resampler {
    /// `native_rate` and `target_frame_size` must both be `> 0`; this is a
    /// construction-time invariant (spec §4.1 failure semantics), not a
    /// recoverable `Result` — violating it is a caller bug.
    pub fn new(native_rate: u32, target_frame_size: usize) -> Self {
        assert!(native_rate > 0, "native_rate must be > 0");
        assert!(target_frame_size > 0, "target_frame_size must be > 0");

        let input_samples_per_frame =
            ((target_frame_size as u64 * native_rate as u64) as f64 / TARGET_RATE as f64).ceil()
                as usize;

        Self {
            native_rate,
            target_frame_size,
            input_samples_per_frame: input_samples_per_frame.max(1),
            pending: Vec::new(),
        }
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    pub fn target_frame_size(&self) -> usize {
        self.target_frame_size
    }

    /// True if a partial frame's worth of native-rate samples is buffered
    /// from the last `process()` call (always `< input_samples_per_frame`,
    /// since `process()` drains every complete frame it can).
    pub fn has_residual(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Zero-pads any pending residue up to one full input window, box-filters
    /// it into exactly one more output frame, and clears the residue.
    /// Returns `None` if there is no residue to pad (spec §4.3 flush: "if
    /// `0 < pendingSamples.length < frameSamples`, zero-pad to `frameSamples`
    /// and process once").
    pub fn drain_residual_padded(&mut self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.resize(self.input_samples_per_frame, 0.0);
        let frame = self.box_filter_frame(&self.pending);
        self.pending.clear();
        Some(frame)
    }

    /// Appends `input` to the rolling buffer and returns every complete
    /// output frame that can now be produced. Residue is retained for the
    /// next call; a zero-length input yields zero frames.
    pub fn process(&mut self, input: &[f32]) -> Vec<Vec<f32>> {
        if input.is_empty() && self.pending.len() < self.input_samples_per_frame {
            return Vec::new();
        }

        self.pending.extend_from_slice(input);

        let mut frames = Vec::new();
        while self.pending.len() >= self.input_samples_per_frame {
            let window = &self.pending[..self.input_samples_per_frame];
            frames.push(self.box_filter_frame(window));
            self.pending.drain(..self.input_samples_per_frame);
        }
        frames
    }

    /// Produces one output frame of `target_frame_size` samples from an
    /// input window of `input_samples_per_frame` samples, per spec §4.1's
    /// box-filter algorithm: for each output index `k`, average the input
    /// samples from `floor((k-1)*r)+1` to `floor(k*r)` inclusive, where
    /// `r = native_rate / 16000`.
    fn box_filter_frame(&self, window: &[f32]) -> Vec<f32> {
        if self.native_rate == TARGET_RATE {
            return window[..self.target_frame_size.min(window.len())].to_vec();
        }

        let r = self.native_rate as f64 / TARGET_RATE as f64;
        let mut out = Vec::with_capacity(self.target_frame_size);
        let max_idx = window.len().saturating_sub(1);

        for k in 0..self.target_frame_size {
            let cur = ((k as f64) * r).floor() as usize;
            let cur = cur.min(max_idx);
            let prev = if k == 0 {
                0
            } else {
                (((k - 1) as f64 * r).floor() as usize + 1).min(cur)
            };

            let mut sum = 0.0f64;
            let mut count = 0usize;
            for idx in prev..=cur {
                sum += window[idx] as f64;
                count += 1;
            }
            out.push((sum / count.max(1) as f64) as f32);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passthrough_at_16khz() {
        let mut r = Resampler::new(16_000, 512);
        let input: Vec<f32> = (0..512).map(|i| i as f32 / 512.0).collect();
        let frames = r.process(&input);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], input);
    }

    #[test]
    fn zero_length_input_yields_zero_frames() {
        let mut r = Resampler::new(48_000, 512);
        assert_eq!(r.process(&[]).len(), 0);
    }

    #[test]
    fn every_output_frame_has_exact_length() {
        let mut r = Resampler::new(48_000, 512);
        let input = vec![0.1f32; 48_000 * 2];
        let frames = r.process(&input);
        assert!(!frames.is_empty());
        for f in &frames {
            assert_eq!(f.len(), 512);
        }
    }

    #[test]
    fn residue_carries_across_calls() {
        // Same total input, split into two different chunkings, must produce
        // the same frame count (spec: "exactly what would have been produced
        // by concatenating all input first").
        let input = vec![0.0f32; 48_000];

        let mut one_shot = Resampler::new(48_000, 512);
        let frames_one_shot = one_shot.process(&input);

        let mut streamed = Resampler::new(48_000, 512);
        let mut frames_streamed = Vec::new();
        for chunk in input.chunks(777) {
            frames_streamed.extend(streamed.process(chunk));
        }

        assert_eq!(frames_one_shot.len(), frames_streamed.len());
    }

    #[test]
    fn p5_frame_count_matches_length_law() {
        // P5: total frames * frame_samples == floor(N * 16000 / (r * input_samples_per_frame))
        // * frame_samples, within one frame of residue.
        let native_rate = 48_000u32;
        let frame_samples = 512usize;
        let mut r = Resampler::new(native_rate, frame_samples);
        let n = 48_000 * 3 + 123;
        let input = vec![0.0f32; n];
        let frames = r.process(&input);

        let input_samples_per_frame = r.input_samples_per_frame;
        let expected_frames = n / input_samples_per_frame;
        assert!(
            (frames.len() as i64 - expected_frames as i64).abs() <= 1,
            "expected ~{} frames, got {}",
            expected_frames,
            frames.len()
        );
    }

    #[test]
    fn residual_padding_yields_one_more_frame_of_exact_length() {
        let mut r = Resampler::new(48_000, 512);
        let input_samples_per_frame = r.input_samples_per_frame;
        let input = vec![0.1f32; input_samples_per_frame / 2];
        let frames = r.process(&input);
        assert!(frames.is_empty());
        assert!(r.has_residual());

        let padded = r.drain_residual_padded().expect("residue was pending");
        assert_eq!(padded.len(), 512);
        assert!(!r.has_residual());
    }

    #[test]
    fn no_residual_drain_is_none() {
        let mut r = Resampler::new(16_000, 512);
        let _ = r.process(&vec![0.0f32; 512]);
        assert!(!r.has_residual());
        assert!(r.drain_residual_padded().is_none());
    }
}
