use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single transcribed word with its timing, in seconds from the start of
/// the recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Delivery metrics derived from one transcript. Immutable once extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub word_count: usize,
    pub filler_count: usize,
    /// Fillers per hundred words.
    pub filler_rate: f64,
    /// Words per minute; only available when word timings were supplied.
    pub wpm: Option<f64>,
    /// Inter-word gaps longer than [`LONG_PAUSE_SECS`].
    pub long_pauses: usize,
}

/// Gap between consecutive words that counts as a long pause.
pub const LONG_PAUSE_SECS: f64 = 0.8;

lazy_static! {
    // Multi-word fillers come first so the alternation prefers them over
    // their single-word prefixes.
    static ref FILLER_PATTERN: Regex = Regex::new(
        r"(?i)\b(you know|i mean|sort of|kind of|um|uh|erm|uhm|hmm|like|actually|basically|so|well|right)\b"
    )
    .unwrap();
}

/// Derives delivery metrics from a transcript and optional word timings.
/// Pure: empty input yields all-zero metrics, there is no failure path.
pub fn extract_metrics(transcript: &str, timings: Option<&[WordTiming]>) -> Metrics {
    let word_count = transcript.split_whitespace().count();
    if word_count == 0 {
        return Metrics::default();
    }

    let filler_count = FILLER_PATTERN.find_iter(transcript).count();
    let filler_rate = filler_count as f64 / word_count as f64 * 100.0;

    let mut wpm = None;
    let mut long_pauses = 0;
    if let Some(words) = timings {
        if let (Some(first), Some(last)) = (words.first(), words.last()) {
            let duration = last.end - first.start;
            if duration > 0.0 {
                wpm = Some(word_count as f64 / (duration / 60.0));
            }
        }
        long_pauses = words
            .windows(2)
            .filter(|pair| pair[1].start - pair[0].end > LONG_PAUSE_SECS)
            .count();
    }

    Metrics {
        word_count,
        filler_count,
        filler_rate,
        wpm,
        long_pauses,
    }
}
