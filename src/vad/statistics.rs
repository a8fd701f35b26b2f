use serde::{Deserialize, Serialize, Serializer};

use super::segments::SpeechSegment;

/// Summary of one detection. Values are kept at full precision; the
/// floating fields are rounded to milliseconds only when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_segments: usize,
    #[serde(serialize_with = "serialize_rounded")]
    pub total_speech_duration: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub total_audio_duration: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub speech_ratio: f64,
    pub sample_rate: u32,
    pub threshold_used: f32,
}

/// Pure: sums segment durations and derives the speech ratio.
/// The ratio is 0 for a zero-length clip.
pub fn aggregate(
    segments: &[SpeechSegment],
    audio_duration: f64,
    sample_rate: u32,
    threshold: f32,
) -> Statistics {
    let total_speech_duration: f64 = segments.iter().map(SpeechSegment::duration).sum();
    let speech_ratio = if audio_duration > 0.0 {
        total_speech_duration / audio_duration
    } else {
        0.0
    };

    Statistics {
        total_segments: segments.len(),
        total_speech_duration,
        total_audio_duration: audio_duration,
        speech_ratio,
        sample_rate,
        threshold_used: threshold,
    }
}

/// Round to 3 decimal places for presentation
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub(crate) fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round3(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64) -> SpeechSegment {
        SpeechSegment { start, end }
    }

    #[test]
    fn sums_durations_and_computes_ratio() {
        let stats = aggregate(&[seg(0.5, 2.0), seg(3.0, 4.5)], 6.0, 16000, 0.5);
        assert_eq!(stats.total_segments, 2);
        assert!((stats.total_speech_duration - 3.0).abs() < 1e-12);
        assert!((stats.speech_ratio - 0.5).abs() < 1e-12);
        assert_eq!(stats.sample_rate, 16000);
        assert_eq!(stats.threshold_used, 0.5);
    }

    #[test]
    fn zero_length_audio_has_zero_ratio() {
        let stats = aggregate(&[], 0.0, 16000, 0.5);
        assert_eq!(stats.total_segments, 0);
        assert_eq!(stats.total_audio_duration, 0.0);
        assert_eq!(stats.speech_ratio, 0.0);
    }

    #[test]
    fn internal_values_keep_full_precision() {
        let stats = aggregate(&[seg(0.0, 1.0)], 3.0, 8000, 0.5);
        assert_eq!(stats.speech_ratio, 1.0 / 3.0);
    }

    #[test]
    fn serialized_values_are_rounded_to_milliseconds() {
        let stats = aggregate(&[seg(0.0, 1.0)], 3.0, 8000, 0.5);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["speech_ratio"], 0.333);
        assert_eq!(json["total_audio_duration"], 3.0);
        assert_eq!(json["total_segments"], 1);
    }
}
