//! The frame-based hysteresis state machine: turns noisy per-frame speech
//! probabilities into clean segment boundaries (spec §4.2). State naming and
//! the pre-roll-ring / redemption-counter shape are grounded on
//! `silero_audio_processor.rs`'s `VadState`/`update_vad_state`, generalized
//! from its four-state threshold logic into the spec's explicit
//! redemption-origin-tracking five-state machine.

use std::collections::VecDeque;

use crate::config::Config;
use crate::event::{Event, SpeechProbabilities};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Silence,
    Speaking,
    SpeakingConfirmed,
    Redemption,
}

/// Which state redemption was entered from, so a recovery (prob back above
/// `p+`) knows whether to resume counting toward `SpeechRealStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedemptionOrigin {
    Speaking,
    SpeakingConfirmed,
}

/// Consumes one probability-tagged frame at a time and emits at most one
/// event per input frame, plus terminal events on `pause`/`end_segment`.
pub struct FrameProcessor {
    config: Config,
    state: State,
    pre_roll: VecDeque<Vec<f32>>,
    segment: Vec<f32>,
    speech_frames_in_segment: usize,
    redemption_counter: usize,
    redemption_origin: Option<RedemptionOrigin>,
}

impl FrameProcessor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: State::Idle,
            pre_roll: VecDeque::new(),
            segment: Vec::new(),
            speech_frames_in_segment: 0,
            redemption_counter: 0,
            redemption_origin: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clears pre-roll and segment state and transitions to `Silence`. The
    /// model's own state reset is the caller's responsibility (the
    /// processor has no model handle; see [`crate::stream::StreamVad`]).
    pub fn resume(&mut self) {
        self.pre_roll.clear();
        self.segment.clear();
        self.speech_frames_in_segment = 0;
        self.redemption_counter = 0;
        self.redemption_origin = None;
        self.state = State::Silence;
    }

    /// Runs the state machine for one frame and returns the `FrameProcessed`
    /// side-event plus at most one speech-transition event (spec invariant 4).
    /// If the processor is `Idle` (not between `start()`/`pause()`), the
    /// frame is ignored entirely and `None` is returned.
    pub fn process(&mut self, frame: Vec<f32>, probs: SpeechProbabilities) -> Option<Vec<Event>> {
        if self.state == State::Idle {
            return None;
        }

        let mut events = vec![Event::FrameProcessed {
            probs,
            frame: frame.clone(),
        }];

        let p = probs.is_speech;
        let p_pos = self.config.positive_speech_threshold;
        let p_neg = self.config.negative_speech_threshold;

        match self.state {
            State::Idle => unreachable!("handled above"),
            State::Silence => {
                if p >= p_pos {
                    self.drain_preroll_into_segment();
                    self.segment.push_frame(&frame);
                    self.speech_frames_in_segment = 1;
                    self.state = State::Speaking;
                    events.push(Event::SpeechStart);
                } else {
                    self.push_preroll(frame);
                }
            }
            State::Speaking | State::SpeakingConfirmed => {
                if p >= p_pos {
                    self.segment.push_frame(&frame);
                    self.speech_frames_in_segment += 1;
                    if self.state == State::Speaking
                        && self.speech_frames_in_segment >= self.config.min_speech_frames
                    {
                        self.state = State::SpeakingConfirmed;
                        events.push(Event::SpeechRealStart);
                    }
                } else if p >= p_neg {
                    // middle band: hold
                    self.segment.push_frame(&frame);
                } else {
                    self.segment.push_frame(&frame);
                    self.redemption_origin = Some(if self.state == State::Speaking {
                        RedemptionOrigin::Speaking
                    } else {
                        RedemptionOrigin::SpeakingConfirmed
                    });
                    // The triggering frame itself counts toward the grace
                    // budget, so only `redemption_frames - 1` further
                    // sub-threshold frames are tolerated after it.
                    if self.config.redemption_frames == 0 {
                        if let Some(ev) = self.terminate_segment() {
                            events.push(ev);
                        }
                    } else {
                        self.redemption_counter = self.config.redemption_frames - 1;
                        self.state = State::Redemption;
                    }
                }
            }
            State::Redemption => {
                self.segment.push_frame(&frame);
                if p >= p_pos {
                    let origin = self
                        .redemption_origin
                        .take()
                        .unwrap_or(RedemptionOrigin::Speaking);
                    self.redemption_counter = 0;
                    if origin == RedemptionOrigin::Speaking {
                        self.speech_frames_in_segment += 1;
                        if self.speech_frames_in_segment >= self.config.min_speech_frames {
                            self.state = State::SpeakingConfirmed;
                            events.push(Event::SpeechRealStart);
                        } else {
                            self.state = State::Speaking;
                        }
                    } else {
                        self.state = State::SpeakingConfirmed;
                    }
                } else {
                    self.redemption_counter = self.redemption_counter.saturating_sub(1);
                    if self.redemption_counter == 0 {
                        if let Some(ev) = self.terminate_segment() {
                            events.push(ev);
                        }
                    }
                }
            }
        }

        Some(events)
    }

    /// Mid-stream variant of `pause`: same logic, but returns state to
    /// `Silence` instead of `Idle`, so processing can continue (e.g. on
    /// EOF/flush).
    pub fn end_segment(&mut self) -> Option<Event> {
        let event = self.pause_or_end();
        if self.state != State::Idle {
            self.state = State::Silence;
        }
        event
    }

    /// Unconditionally returns the processor to `Idle`. If speaking and
    /// `submit_user_speech_on_pause` with enough speech frames, emits
    /// `SpeechEnd`; else emits `VadMisfire` iff a speech-start is in
    /// progress without having met `min_speech_frames`; else no event.
    pub fn pause(&mut self) -> Option<Event> {
        let event = self.pause_or_end();
        self.state = State::Idle;
        event
    }

    fn pause_or_end(&mut self) -> Option<Event> {
        let in_progress = matches!(
            self.state,
            State::Speaking | State::SpeakingConfirmed | State::Redemption
        );
        if !in_progress {
            self.clear_segment_state();
            return None;
        }

        let met_min = self.speech_frames_in_segment >= self.config.min_speech_frames;
        let event = if self.config.submit_user_speech_on_pause && met_min {
            Some(Event::SpeechEnd {
                audio: std::mem::take(&mut self.segment),
            })
        } else if !met_min {
            Some(Event::VadMisfire)
        } else {
            None
        };

        self.clear_segment_state();
        event
    }

    /// Redemption counter exhausted: emits `SpeechEnd` if the segment met
    /// `min_speech_frames`, else `VadMisfire`. Transitions to `Silence`.
    fn terminate_segment(&mut self) -> Option<Event> {
        let met_min = self.speech_frames_in_segment >= self.config.min_speech_frames;
        let event = if met_min {
            Event::SpeechEnd {
                audio: std::mem::take(&mut self.segment),
            }
        } else {
            Event::VadMisfire
        };
        self.clear_segment_state();
        self.state = State::Silence;
        Some(event)
    }

    fn clear_segment_state(&mut self) {
        self.segment.clear();
        self.speech_frames_in_segment = 0;
        self.redemption_counter = 0;
        self.redemption_origin = None;
        self.pre_roll.clear();
    }

    fn push_preroll(&mut self, frame: Vec<f32>) {
        if self.config.pre_speech_pad_frames == 0 {
            return;
        }
        if self.pre_roll.len() >= self.config.pre_speech_pad_frames {
            self.pre_roll.pop_front();
        }
        self.pre_roll.push_back(frame);
    }

    fn drain_preroll_into_segment(&mut self) {
        for frame in self.pre_roll.drain(..) {
            self.segment.push_frame(&frame);
        }
    }
}

trait PushFrame {
    fn push_frame(&mut self, frame: &[f32]);
}

impl PushFrame for Vec<f32> {
    fn push_frame(&mut self, frame: &[f32]) {
        self.extend_from_slice(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config {
            frame_samples: 512,
            positive_speech_threshold: 0.5,
            negative_speech_threshold: 0.35,
            redemption_frames: 8,
            pre_speech_pad_frames: 1,
            min_speech_frames: 3,
            submit_user_speech_on_pause: false,
            sample_rate: 16_000,
        }
    }

    fn probs(is_speech: f32) -> SpeechProbabilities {
        SpeechProbabilities {
            is_speech,
            not_speech: 1.0 - is_speech,
        }
    }

    fn frame() -> Vec<f32> {
        vec![0.0; 512]
    }

    fn feed(fp: &mut FrameProcessor, n: usize, is_speech: f32) -> Vec<Event> {
        let mut out = Vec::new();
        for _ in 0..n {
            if let Some(evs) = fp.process(frame(), probs(is_speech)) {
                out.extend(evs);
            }
        }
        out
    }

    #[test]
    fn pure_silence_emits_only_frame_processed() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let events = feed(&mut fp, 50, 0.1);
        assert_eq!(events.len(), 50);
        assert!(events
            .iter()
            .all(|e| matches!(e, Event::FrameProcessed { .. })));
    }

    #[test]
    fn clean_speech_produces_start_real_start_and_end() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let mut events = Vec::new();
        events.extend(feed(&mut fp, 2, 0.1));
        events.extend(feed(&mut fp, 10, 0.9));
        events.extend(feed(&mut fp, 12, 0.1));

        let starts = events.iter().filter(|e| e.is_speech_start()).count();
        assert_eq!(starts, 1);
        let real_starts = events
            .iter()
            .filter(|e| matches!(e, Event::SpeechRealStart))
            .count();
        assert_eq!(real_starts, 1);

        let end = events
            .iter()
            .find_map(|e| match e {
                Event::SpeechEnd { audio } => Some(audio),
                _ => None,
            })
            .expect("expected a SpeechEnd");
        // 1 preroll + 10 speech + 8 redemption frames = 19 frames * 512
        assert_eq!(end.len(), 19 * 512);
    }

    #[test]
    fn misfire_on_insufficient_speech_frames() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let mut events = Vec::new();
        events.extend(feed(&mut fp, 2, 0.1));
        events.extend(feed(&mut fp, 2, 0.9));
        events.extend(feed(&mut fp, 12, 0.1));

        assert_eq!(events.iter().filter(|e| e.is_speech_start()).count(), 1);
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::SpeechRealStart)));
        assert!(events.iter().any(|e| matches!(e, Event::VadMisfire)));
        assert!(!events.iter().any(|e| matches!(e, Event::SpeechEnd { .. })));
    }

    #[test]
    fn redemption_survives_middle_band() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let mut events = Vec::new();
        events.extend(feed(&mut fp, 2, 0.1));
        events.extend(feed(&mut fp, 4, 0.9));
        events.extend(feed(&mut fp, 5, 0.4));
        events.extend(feed(&mut fp, 4, 0.9));
        events.extend(feed(&mut fp, 10, 0.1));

        assert_eq!(events.iter().filter(|e| e.is_speech_start()).count(), 1);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::SpeechRealStart))
                .count(),
            1
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::SpeechEnd { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn brief_sub_threshold_gap_does_not_misfire() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let mut events = Vec::new();
        events.extend(feed(&mut fp, 2, 0.1));
        events.extend(feed(&mut fp, 5, 0.9));
        events.extend(feed(&mut fp, 4, 0.1));
        events.extend(feed(&mut fp, 5, 0.9));
        events.extend(feed(&mut fp, 10, 0.1));

        assert_eq!(events.iter().filter(|e| e.is_speech_start()).count(), 1);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::SpeechRealStart))
                .count(),
            1
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::SpeechEnd { .. }))
                .count(),
            1
        );
        assert!(!events.iter().any(|e| matches!(e, Event::VadMisfire)));
    }

    #[test]
    fn pause_with_submit_flag_emits_speech_end() {
        let mut config = cfg();
        config.submit_user_speech_on_pause = true;
        let mut fp = FrameProcessor::new(config);
        fp.resume();
        feed(&mut fp, 2, 0.1);
        feed(&mut fp, 5, 0.9);

        let event = fp.pause();
        assert!(matches!(event, Some(Event::SpeechEnd { .. })));
    }

    #[test]
    fn pause_without_submit_flag_misfires_or_nothing() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        feed(&mut fp, 2, 0.1);
        feed(&mut fp, 5, 0.9);

        let event = fp.pause();
        assert!(matches!(event, Some(Event::VadMisfire)) || event.is_none());
    }

    #[test]
    fn end_segment_with_submit_flag_emits_speech_end() {
        let mut config = cfg();
        config.submit_user_speech_on_pause = true;
        let mut fp = FrameProcessor::new(config);
        fp.resume();
        feed(&mut fp, 2, 0.1);
        feed(&mut fp, 5, 0.9);

        let event = fp.end_segment();
        assert!(matches!(event, Some(Event::SpeechEnd { .. })));
        // end_segment returns to Silence, not Idle: further frames still process.
        assert!(fp.process(frame(), probs(0.1)).is_some());
    }

    #[test]
    fn end_segment_without_submit_flag_misfires_or_nothing() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        feed(&mut fp, 2, 0.1);
        feed(&mut fp, 5, 0.9);

        let event = fp.end_segment();
        assert!(matches!(event, Some(Event::VadMisfire)) || event.is_none());
    }

    #[test]
    fn idle_frames_are_ignored() {
        let mut fp = FrameProcessor::new(cfg());
        assert!(fp.process(frame(), probs(0.9)).is_none());
    }

    #[test]
    fn every_speech_end_audio_respects_preroll_length_bounds() {
        let mut fp = FrameProcessor::new(cfg());
        fp.resume();
        let mut events = Vec::new();
        events.extend(feed(&mut fp, 2, 0.1));
        events.extend(feed(&mut fp, 10, 0.9));
        events.extend(feed(&mut fp, 12, 0.1));

        let audio = events
            .iter()
            .find_map(|e| match e {
                Event::SpeechEnd { audio } => Some(audio),
                _ => None,
            })
            .unwrap();
        let fs = fp.config().frame_samples;
        let lower = (1 + fp.config().pre_speech_pad_frames) * fs;
        assert!(audio.len() >= lower);
    }
}
