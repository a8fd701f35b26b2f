//! Turns a scorer's per-frame speech probabilities into discrete speech
//! segments.
//!
//! ## Algorithm
//!
//! 1. Score the waveform.
//! 2. A frame is active iff `probability >= threshold`. Runs of active frames
//!    become candidates `[first.time, last.time + hop)`, clamped to the clip.
//! 3. Walking left to right, a candidate whose gap to the last kept segment
//!    is shorter than `min_silence` is folded into it. Comparing against the
//!    already-merged segment lets merges cascade, so one pass reaches the
//!    fixed point.
//! 4. Segments shorter than `min_speech` are dropped. Dropping only widens
//!    the gaps between survivors, so step 3's guarantee still holds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::interface::{ScoreTrack, SpeechScorer};
use crate::audio::WaveformBuffer;
use crate::error::VadError;

/// Slack for comparisons between durations derived from frame arithmetic.
/// A 250 ms span assembled from 20 ms hops must not be pruned because its
/// floating point length came out a hair short.
pub const TIME_EPSILON: f64 = 1e-9;

/// Per-request detection parameters. Millisecond values are converted to
/// seconds once, here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionConfig {
    threshold: f32,
    min_speech_duration_ms: u32,
    min_silence_duration_ms: u32,
    min_speech_secs: f64,
    min_silence_secs: f64,
}

impl DetectionConfig {
    pub fn new(
        threshold: f32,
        min_speech_duration_ms: u32,
        min_silence_duration_ms: u32,
    ) -> Result<Self, VadError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(VadError::validation(format!(
                "threshold must be within [0.0, 1.0], got {}",
                threshold
            )));
        }

        Ok(Self {
            threshold,
            min_speech_duration_ms,
            min_silence_duration_ms,
            min_speech_secs: f64::from(min_speech_duration_ms) / 1000.0,
            min_silence_secs: f64::from(min_silence_duration_ms) / 1000.0,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn min_speech_duration_ms(&self) -> u32 {
        self.min_speech_duration_ms
    }

    pub fn min_silence_duration_ms(&self) -> u32 {
        self.min_silence_duration_ms
    }

    pub fn min_speech_secs(&self) -> f64 {
        self.min_speech_secs
    }

    pub fn min_silence_secs(&self) -> f64 {
        self.min_silence_secs
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_speech_duration_ms: 250,
            min_silence_duration_ms: 100,
            min_speech_secs: 0.25,
            min_silence_secs: 0.1,
        }
    }
}

/// A detected speech range, in seconds. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
}

impl SpeechSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Runs the loaded scorer over a waveform and extracts segments from it
pub struct SegmentExtractor {
    scorer: Arc<dyn SpeechScorer>,
}

impl SegmentExtractor {
    pub fn new(scorer: Arc<dyn SpeechScorer>) -> Self {
        Self { scorer }
    }

    /// Blocking: runs the acoustic model.
    pub fn extract(
        &self,
        waveform: &WaveformBuffer,
        config: &DetectionConfig,
    ) -> Result<Vec<SpeechSegment>, VadError> {
        if waveform.is_empty() {
            return Ok(Vec::new());
        }

        let track = self
            .scorer
            .score(waveform.samples(), waveform.sample_rate())
            .map_err(|e| {
                VadError::processing(format!("{} scorer failed: {:#}", self.scorer.name(), e))
            })?;

        debug!(
            scorer = self.scorer.name(),
            frames = track.frames.len(),
            hop_secs = track.hop_secs,
            "Scored waveform"
        );

        Ok(extract_segments(&track, waveform.duration(), config))
    }
}

/// Steps 2-4 of the algorithm, over an existing score track
pub fn extract_segments(
    track: &ScoreTrack,
    audio_duration: f64,
    config: &DetectionConfig,
) -> Vec<SpeechSegment> {
    let candidates = threshold_frames(track, audio_duration, config.threshold());
    let merged = merge_close_segments(candidates, config.min_silence_secs());
    prune_short_segments(merged, config.min_speech_secs())
}

fn threshold_frames(track: &ScoreTrack, audio_duration: f64, threshold: f32) -> Vec<SpeechSegment> {
    let mut candidates = Vec::new();
    // (first active frame time, last active frame time)
    let mut open: Option<(f64, f64)> = None;

    for frame in &track.frames {
        if frame.probability >= threshold {
            open = Some(match open {
                Some((start, _)) => (start, frame.time),
                None => (frame.time, frame.time),
            });
        } else if let Some((start, last)) = open.take() {
            push_candidate(&mut candidates, start, last + track.hop_secs, audio_duration);
        }
    }
    if let Some((start, last)) = open {
        push_candidate(&mut candidates, start, last + track.hop_secs, audio_duration);
    }

    candidates
}

fn push_candidate(out: &mut Vec<SpeechSegment>, start: f64, end: f64, audio_duration: f64) {
    let end = end.min(audio_duration);
    if end > start {
        out.push(SpeechSegment { start, end });
    }
}

fn merge_close_segments(candidates: Vec<SpeechSegment>, min_silence: f64) -> Vec<SpeechSegment> {
    let mut merged: Vec<SpeechSegment> = Vec::with_capacity(candidates.len());
    for segment in candidates {
        match merged.last_mut() {
            Some(prev) if segment.start - prev.end < min_silence - TIME_EPSILON => {
                prev.end = prev.end.max(segment.end);
            }
            _ => merged.push(segment),
        }
    }
    merged
}

fn prune_short_segments(segments: Vec<SpeechSegment>, min_speech: f64) -> Vec<SpeechSegment> {
    segments
        .into_iter()
        .filter(|s| s.duration() >= min_speech - TIME_EPSILON)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::interface::FrameScore;

    const HOP: f64 = 0.02;

    /// Frames every `HOP` seconds over `[0, total)`, active inside any of `spans`.
    fn track_with_spans(total: f64, spans: &[(f64, f64)]) -> ScoreTrack {
        let count = (total / HOP).round() as usize;
        let frames = (0..count)
            .map(|i| {
                let time = i as f64 * HOP;
                let active = spans
                    .iter()
                    .any(|&(s, e)| time >= s - TIME_EPSILON && time < e - TIME_EPSILON);
                FrameScore {
                    time,
                    probability: if active { 0.9 } else { 0.1 },
                }
            })
            .collect();
        ScoreTrack::new(HOP, frames)
    }

    fn push_run(frames: &mut Vec<FrameScore>, from: f64, to: f64, probability: f32) {
        let count = ((to - from) / HOP).round() as usize;
        for i in 0..count {
            frames.push(FrameScore {
                time: from + i as f64 * HOP,
                probability,
            });
        }
    }

    /// Active runs covering 0.5–2.0 s and 2.05–4.5 s. The second run starts
    /// off the 20 ms grid, so its frames are laid out from its own start.
    fn split_utterance_track() -> ScoreTrack {
        let mut frames = Vec::new();
        push_run(&mut frames, 0.0, 0.5, 0.05);
        push_run(&mut frames, 0.5, 2.0, 0.95);
        push_run(&mut frames, 2.0, 2.06, 0.05);
        push_run(&mut frames, 2.05, 4.49, 0.95);
        frames.push(FrameScore { time: 4.48, probability: 0.95 });
        push_run(&mut frames, 4.5, 5.0, 0.05);
        ScoreTrack::new(HOP, frames)
    }

    fn config(threshold: f32, min_speech_ms: u32, min_silence_ms: u32) -> DetectionConfig {
        DetectionConfig::new(threshold, min_speech_ms, min_silence_ms).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_invariants(segments: &[SpeechSegment], cfg: &DetectionConfig) {
        for s in segments {
            assert!(s.start < s.end);
            assert!(s.duration() >= cfg.min_speech_secs() - TIME_EPSILON);
        }
        for pair in segments.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(pair[1].start - pair[0].end >= cfg.min_silence_secs() - TIME_EPSILON);
        }
    }

    #[test]
    fn short_gap_is_merged_into_one_segment() {
        let cfg = config(0.5, 250, 100);
        let segments = extract_segments(&split_utterance_track(), 5.0, &cfg);

        assert_eq!(segments.len(), 1);
        assert_close(segments[0].start, 0.5);
        assert_close(segments[0].end, 4.5);
        assert_invariants(&segments, &cfg);
    }

    #[test]
    fn gap_longer_than_min_silence_keeps_segments_apart() {
        let cfg = config(0.5, 250, 30);
        let segments = extract_segments(&split_utterance_track(), 5.0, &cfg);

        assert_eq!(segments.len(), 2);
        assert_close(segments[0].start, 0.5);
        assert_close(segments[0].end, 2.0);
        assert_close(segments[1].start, 2.05);
        assert_close(segments[1].end, 4.5);
        assert_invariants(&segments, &cfg);
    }

    #[test]
    fn isolated_short_span_is_pruned() {
        let cfg = config(0.5, 250, 100);
        let track = track_with_spans(3.0, &[(1.0, 1.15)]);
        assert!(extract_segments(&track, 3.0, &cfg).is_empty());
    }

    #[test]
    fn span_exactly_at_min_speech_survives() {
        let cfg = config(0.5, 240, 100);
        let track = track_with_spans(3.0, &[(1.0, 1.24)]);
        let segments = extract_segments(&track, 3.0, &cfg);
        assert_eq!(segments.len(), 1);
        assert_close(segments[0].duration(), 0.24);
    }

    #[test]
    fn pruned_segment_is_not_redistributed() {
        let cfg = config(0.5, 250, 100);
        let track = track_with_spans(4.0, &[(0.2, 1.0), (1.5, 1.6), (2.5, 3.5)]);
        let segments = extract_segments(&track, 4.0, &cfg);

        assert_eq!(segments.len(), 2);
        assert_close(segments[0].end, 1.0);
        assert_close(segments[1].start, 2.5);
    }

    #[test]
    fn alternating_frames_cascade_into_one_segment() {
        // active, inactive, active, ... with 20 ms gaps
        let frames: Vec<FrameScore> = (0..100)
            .map(|i| FrameScore {
                time: i as f64 * HOP,
                probability: if i % 2 == 0 { 0.8 } else { 0.2 },
            })
            .collect();
        let track = ScoreTrack::new(HOP, frames);
        let cfg = config(0.5, 250, 100);
        let segments = extract_segments(&track, 2.0, &cfg);

        assert_eq!(segments.len(), 1);
        assert_close(segments[0].start, 0.0);
        assert_close(segments[0].end, 1.98);
    }

    #[test]
    fn probability_equal_to_threshold_counts_as_active() {
        let frames = vec![
            FrameScore { time: 0.0, probability: 0.1 },
            FrameScore { time: 0.02, probability: 0.5 },
            FrameScore { time: 0.04, probability: 0.1 },
        ];
        let cfg = config(0.5, 0, 0);
        let segments = extract_segments(&ScoreTrack::new(HOP, frames), 0.06, &cfg);

        assert_eq!(segments.len(), 1);
        assert_close(segments[0].start, 0.02);
        assert_close(segments[0].end, 0.04);
    }

    #[test]
    fn trailing_segment_is_clamped_to_clip_duration() {
        let frames = vec![
            FrameScore { time: 0.0, probability: 0.9 },
            FrameScore { time: 0.02, probability: 0.9 },
        ];
        let cfg = config(0.5, 0, 0);
        let segments = extract_segments(&ScoreTrack::new(HOP, frames), 0.03, &cfg);
        assert_close(segments[0].end, 0.03);
    }

    #[test]
    fn empty_track_yields_no_segments() {
        let cfg = DetectionConfig::default();
        assert!(extract_segments(&ScoreTrack::default(), 0.0, &cfg).is_empty());
    }

    #[test]
    fn invariants_hold_across_configurations() {
        let track = track_with_spans(
            10.0,
            &[(0.3, 0.5), (0.56, 1.2), (1.3, 1.34), (2.0, 4.0), (4.04, 4.1), (6.0, 9.0)],
        );
        for &threshold in &[0.0f32, 0.5, 0.9, 1.0] {
            for &min_speech in &[0u32, 50, 250, 1000] {
                for &min_silence in &[0u32, 30, 100, 500] {
                    let cfg = config(threshold, min_speech, min_silence);
                    let segments = extract_segments(&track, 10.0, &cfg);
                    assert_invariants(&segments, &cfg);
                }
            }
        }
    }

    #[test]
    fn extraction_is_repeatable() {
        let track = track_with_spans(5.0, &[(0.5, 1.5), (1.58, 3.0)]);
        let cfg = DetectionConfig::default();
        assert_eq!(
            extract_segments(&track, 5.0, &cfg),
            extract_segments(&track, 5.0, &cfg)
        );
    }

    #[test]
    fn threshold_outside_unit_range_is_rejected() {
        assert!(DetectionConfig::new(1.01, 250, 100).is_err());
        assert!(DetectionConfig::new(-0.1, 250, 100).is_err());
        assert!(DetectionConfig::new(f32::NAN, 250, 100).is_err());
    }

    #[test]
    fn default_config_matches_explicit_construction() {
        assert_eq!(DetectionConfig::default(), config(0.5, 250, 100));
    }
}
