//! Transcript-only delivery and content signals.
//!
//! Every score here is derived purely from the transcript text and the
//! extracted [`Metrics`]; there are no external calls and no failure path.
//! Sparse input degrades numerically toward the neutral band instead of
//! erroring.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// The ten heuristic signals, each an integer in [0, 5].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicScores {
    pub confidence: u8,
    pub intonation: u8,
    pub articulation: u8,
    pub volume_consistency: u8,
    pub pacing: u8,
    pub emphasis: u8,
    pub engagement: u8,
    pub terminology: u8,
    pub specificity: u8,
    pub depth: u8,
}

/// Domain for the terminology-density lexicon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    SoftwareEngineering,
    DataScience,
    Product,
    Leadership,
}

impl Domain {
    /// Maps a caller-supplied domain name, defaulting to software
    /// engineering for anything unrecognized.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            s if s.contains("data") || s.contains("ml") || s.contains("analytics") => {
                Domain::DataScience
            }
            s if s.contains("product") => Domain::Product,
            s if s.contains("leader") || s.contains("manage") => Domain::Leadership,
            _ => Domain::SoftwareEngineering,
        }
    }

    fn terms(&self) -> &'static [&'static str] {
        match self {
            Domain::SoftwareEngineering => &[
                "api", "database", "latency", "throughput", "scalability", "microservices",
                "cache", "caching", "queue", "kubernetes", "docker", "deployment", "ci/cd",
                "pipeline", "refactoring", "testing", "architecture", "backend", "frontend",
                "framework", "algorithm", "concurrency", "index", "sharding", "replication",
                "monitoring", "observability", "rollback", "migration", "endpoint", "schema",
                "transaction", "idempotent", "load balancer", "postgres", "redis", "kafka",
                "rest", "grpc", "sla",
            ],
            Domain::DataScience => &[
                "model", "feature", "training", "validation", "overfitting", "regression",
                "classification", "precision", "recall", "pipeline", "dataset", "embedding",
                "clustering", "hyperparameter", "baseline", "inference", "drift", "sampling",
                "a/b test", "statistical significance", "correlation", "normalization",
                "gradient", "neural network", "cross-validation", "etl", "dashboard",
                "notebook", "pandas", "sql",
            ],
            Domain::Product => &[
                "roadmap", "stakeholder", "user research", "retention", "conversion",
                "activation", "churn", "north star", "okr", "mvp", "prioritization",
                "discovery", "persona", "funnel", "experiment", "hypothesis", "metric",
                "segmentation", "positioning", "go-to-market", "pricing", "backlog",
                "iteration", "usability", "adoption",
            ],
            Domain::Leadership => &[
                "delegation", "mentoring", "coaching", "alignment", "stakeholder",
                "one-on-one", "feedback", "performance review", "headcount", "hiring",
                "retention", "culture", "vision", "strategy", "prioritization",
                "cross-functional", "escalation", "accountability", "ownership",
                "succession", "conflict resolution", "roadmap", "okr", "morale",
            ],
        }
    }
}

lazy_static! {
    static ref HEDGE_PATTERN: Regex = Regex::new(
        r"(?i)\b(maybe|i think|possibly|perhaps|i guess|not sure|probably|might be|i believe|kind of|sort of|i suppose)\b"
    )
    .unwrap();
    static ref STRONG_FIRST_PERSON: Regex = Regex::new(
        r"(?i)\b(i|we)\s+(achieved|delivered|led|built|designed|launched|improved|increased|reduced|created|drove|shipped|owned|solved)\b"
    )
    .unwrap();
    static ref EMPHASIS_PATTERN: Regex = Regex::new(
        r"(?i)\b(really|very|absolutely|definitely|significantly|extremely|crucial|critical|key|major|huge|dramatically|particularly)\b"
    )
    .unwrap();
    static ref ACTION_VERB_PATTERN: Regex = Regex::new(
        r"(?i)\b(built|designed|led|created|implemented|launched|delivered|optimized|migrated|automated|scaled|refactored|deployed|drove|shipped|solved|reduced|increased|improved)\b"
    )
    .unwrap();
    static ref NUMERIC_PATTERN: Regex = Regex::new(
        r"(?i)\d+|%|\b(percent|thousand|million|billion|doubled?|tripled?|halved?|twice)\b"
    )
    .unwrap();
    static ref CAUSAL_PATTERN: Regex = Regex::new(
        r"(?i)\b(because|therefore|as a result|which means|so that|due to|leads to|in order to|consequently|which allowed)\b"
    )
    .unwrap();
    static ref SPECIFICITY_MARKER: Regex = Regex::new(
        r"(?i)\b(for example|for instance|specifically|in particular|such as|e\.g\.)\b"
    )
    .unwrap();
}

/// Computes every heuristic signal for one transcript.
pub fn analyze(transcript: &str, metrics: &Metrics, domain: Domain) -> HeuristicScores {
    let has_timing = metrics.wpm.is_some();
    HeuristicScores {
        confidence: confidence_score(transcript, metrics, has_timing),
        intonation: intonation_score(transcript),
        articulation: articulation_score(transcript, metrics),
        volume_consistency: volume_consistency_score(transcript),
        pacing: pacing_score(transcript, metrics, has_timing),
        emphasis: emphasis_score(transcript),
        engagement: engagement_score(transcript),
        terminology: terminology_score(transcript, domain),
        specificity: specificity_score(transcript),
        depth: depth_score(transcript),
    }
}

// --- individual signals ---

/// Neutral base 3, bounded adjustments for sentence completeness, filler
/// discipline, pauses, declarative first-person verbs and hedging.
pub fn confidence_score(transcript: &str, metrics: &Metrics, has_timing: bool) -> u8 {
    let mut score = 3.0;
    let sentence_lengths = sentence_word_counts(transcript);

    if !sentence_lengths.is_empty() {
        let avg = mean(&sentence_lengths);
        if (10.0..=25.0).contains(&avg) {
            // complete-thought band
            score += 0.5;
        } else if trails_off(transcript) {
            score -= 0.5;
        }
    }

    if metrics.word_count > 0 {
        if metrics.filler_rate < 2.0 {
            score += 0.5;
        } else if metrics.filler_rate > 5.0 {
            score -= 0.5;
        }
    }

    // Pause adjustments are only meaningful when word timings exist.
    if has_timing {
        if metrics.long_pauses == 0 {
            score += 0.5;
        } else if metrics.long_pauses > 3 {
            score -= 0.5;
        }
    }

    if STRONG_FIRST_PERSON.is_match(transcript) {
        score += 0.3;
    }

    if HEDGE_PATTERN.find_iter(transcript).count() > 2 {
        score -= 0.5;
    }

    clamp_score(score)
}

/// Lower neutral base (2.5) for wider dynamic range; six graded
/// expressiveness factors, a monotone penalty, and a sparse-text cap.
pub fn intonation_score(transcript: &str) -> u8 {
    let sentences = split_sentences(transcript);
    let word_count = transcript.split_whitespace().count();
    let mut score = 2.5;
    let mut observed = 0usize;
    let mut marker_seen = false;

    // 1. exclamation/question marks per sentence
    if !sentences.is_empty() {
        observed += 1;
        let marks = transcript.matches(['!', '?']).count();
        let ratio = marks as f64 / sentences.len() as f64;
        score += graded_bonus(ratio, 0.5, 0.25, 0.08);
        marker_seen |= marks > 0;
    }

    // 2. normalized sentence-length variance
    let mut length_cv = None;
    if sentences.len() >= 2 {
        observed += 1;
        let lengths = sentence_word_counts(transcript);
        let cv = coefficient_of_variation(&lengths);
        length_cv = Some(cv);
        score += graded_bonus(cv, 0.6, 0.35, 0.15);
        marker_seen |= cv >= 0.15;
    }

    if word_count >= 10 {
        // 3. emphasis-word density
        observed += 1;
        let density = EMPHASIS_PATTERN.find_iter(transcript).count() as f64 / word_count as f64;
        score += graded_bonus(density, 0.06, 0.03, 0.01);
        marker_seen |= density > 0.0;

        // 4. contraction density
        observed += 1;
        let contractions = transcript
            .split_whitespace()
            .filter(|w| w.contains('\''))
            .count();
        score += graded_bonus(contractions as f64 / word_count as f64, 0.05, 0.025, 0.01);

        // 5. action-verb density
        observed += 1;
        let actions = ACTION_VERB_PATTERN.find_iter(transcript).count() as f64;
        score += graded_bonus(actions / word_count as f64, 0.05, 0.025, 0.01);

        // 6. numeric/metric density
        observed += 1;
        let numerics = NUMERIC_PATTERN.find_iter(transcript).count() as f64;
        score += graded_bonus(numerics / word_count as f64, 0.04, 0.02, 0.008);
    }

    // Monotone delivery: no expressiveness markers across a real answer, or
    // near-uniform sentence lengths.
    let monotone = (sentences.len() >= 3 && !marker_seen)
        || length_cv.map(|cv| cv < 0.05).unwrap_or(false);
    if monotone {
        score -= 0.5;
    }

    // Short answers expose too few factors to justify a high score.
    if observed < 3 && word_count < 50 {
        score = score.min(3.5);
    }

    clamp_score(score)
}

/// Articulation proxy: vocabulary length variance and filler discipline.
pub fn articulation_score(transcript: &str, metrics: &Metrics) -> u8 {
    let mut score = 3.0;
    let word_lengths: Vec<f64> = transcript
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).count() as f64)
        .filter(|&l| l > 0.0)
        .collect();

    if word_lengths.len() >= 5 {
        let cv = coefficient_of_variation(&word_lengths);
        if (0.3..=0.7).contains(&cv) {
            score += 1.0;
        } else if cv > 1.0 {
            score -= 0.5;
        }
        if mean(&word_lengths) >= 4.5 {
            score += 0.5;
        }
    }

    if metrics.word_count > 0 {
        if metrics.filler_rate < 2.0 {
            score += 0.5;
        } else if metrics.filler_rate > 8.0 {
            score -= 1.0;
        }
    }

    clamp_score(score)
}

/// Volume-consistency proxy: steadiness of sentence lengths, penalizing
/// spiky exclamation-heavy delivery.
pub fn volume_consistency_score(transcript: &str) -> u8 {
    let mut score = 3.0;
    let sentences = split_sentences(transcript);

    if sentences.len() >= 2 {
        let cv = coefficient_of_variation(&sentence_word_counts(transcript));
        if cv < 0.4 {
            score += 1.0;
        } else if cv < 0.7 {
            score += 0.5;
        } else if cv > 1.2 {
            score -= 1.0;
        }

        let exclaim_ratio = transcript.matches('!').count() as f64 / sentences.len() as f64;
        if exclaim_ratio > 0.5 {
            score -= 0.5;
        }
    }

    clamp_score(score)
}

/// Pacing: WPM banding around the 120-150 conversational sweet spot when
/// timings exist, otherwise sentence-length banding.
pub fn pacing_score(transcript: &str, metrics: &Metrics, has_timing: bool) -> u8 {
    let mut score = 3.0;

    match metrics.wpm {
        Some(wpm) => {
            if (120.0..=150.0).contains(&wpm) {
                score += 1.5;
            } else if (100.0..120.0).contains(&wpm) || (150.0..=170.0).contains(&wpm) {
                score += 0.5;
            } else if !(90.0..=190.0).contains(&wpm) {
                score -= 1.0;
            }
        }
        None => {
            let lengths = sentence_word_counts(transcript);
            if !lengths.is_empty() && (8.0..=22.0).contains(&mean(&lengths)) {
                score += 0.5;
            }
        }
    }

    if has_timing {
        if metrics.long_pauses == 0 {
            score += 0.5;
        } else if metrics.long_pauses > 3 {
            score -= 1.0;
        }
    }

    clamp_score(score)
}

/// Emphasis: density of stress words and quantified claims.
pub fn emphasis_score(transcript: &str) -> u8 {
    let mut score = 2.5;
    let word_count = transcript.split_whitespace().count();
    if word_count == 0 {
        return clamp_score(score);
    }

    let emphasis_density =
        EMPHASIS_PATTERN.find_iter(transcript).count() as f64 / word_count as f64;
    score += graded_bonus(emphasis_density, 0.06, 0.03, 0.01);

    let numeric_density = NUMERIC_PATTERN.find_iter(transcript).count() as f64 / word_count as f64;
    if numeric_density >= 0.03 {
        score += 1.0;
    } else if numeric_density > 0.0 {
        score += 0.5;
    }

    if STRONG_FIRST_PERSON.is_match(transcript) {
        score += 0.5;
    }

    clamp_score(score)
}

/// Engagement: action verbs, examples and listener-directed phrasing.
pub fn engagement_score(transcript: &str) -> u8 {
    let mut score = 3.0;
    let word_count = transcript.split_whitespace().count();
    if word_count == 0 {
        return clamp_score(score);
    }

    let action_density =
        ACTION_VERB_PATTERN.find_iter(transcript).count() as f64 / word_count as f64;
    score += graded_bonus(action_density, 0.06, 0.03, 0.015);

    if SPECIFICITY_MARKER.is_match(transcript) {
        score += 0.5;
    }

    if transcript.contains('?') {
        score += 0.3;
    }

    let sentences = split_sentences(transcript);
    if sentences.len() >= 3
        && action_density == 0.0
        && !SPECIFICITY_MARKER.is_match(transcript)
        && !transcript.contains('?')
    {
        score -= 0.5;
    }

    clamp_score(score)
}

/// Terminology density: fraction of the domain lexicon matched.
pub fn terminology_score(transcript: &str, domain: Domain) -> u8 {
    let lowered = transcript.to_lowercase();
    let terms = domain.terms();
    let matched = terms.iter().filter(|t| lowered.contains(*t)).count();
    let fraction = matched as f64 / terms.len() as f64;

    if fraction >= 0.20 {
        5
    } else if fraction >= 0.15 {
        4
    } else if fraction >= 0.10 {
        3
    } else if fraction >= 0.05 {
        2
    } else if matched > 0 {
        1
    } else {
        0
    }
}

/// Specificity: numeric/metric/example markers.
pub fn specificity_score(transcript: &str) -> u8 {
    let markers = NUMERIC_PATTERN.find_iter(transcript).count()
        + SPECIFICITY_MARKER.find_iter(transcript).count();
    match markers {
        0 => 1,
        1 => 2,
        2 => 3,
        3 | 4 => 4,
        _ => 5,
    }
}

/// Depth: count of complex sentences (>15 words containing a causal
/// connective or a parenthetical technical aside).
pub fn depth_score(transcript: &str) -> u8 {
    let complex = split_sentences(transcript)
        .iter()
        .filter(|s| {
            s.split_whitespace().count() > 15 && (CAUSAL_PATTERN.is_match(s) || s.contains('('))
        })
        .count();
    match complex {
        0 => 1,
        1 => 2,
        2 => 3,
        3 => 4,
        _ => 5,
    }
}

// --- shared text helpers ---

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn sentence_word_counts(text: &str) -> Vec<f64> {
    split_sentences(text)
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect()
}

fn trails_off(text: &str) -> bool {
    let trimmed = text.trim_end();
    text.contains("...") || trimmed.ends_with('-') || trimmed.ends_with('—')
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation normalized by the mean, so the band thresholds are
/// independent of answer length.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m
}

fn graded_bonus(ratio: f64, high: f64, mid: f64, low: f64) -> f64 {
    if ratio >= high {
        1.5
    } else if ratio >= mid {
        1.0
    } else if ratio >= low {
        0.5
    } else {
        0.0
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 5.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract_metrics;

    fn scores_for(transcript: &str) -> HeuristicScores {
        let metrics = extract_metrics(transcript, None);
        analyze(transcript, &metrics, Domain::SoftwareEngineering)
    }

    #[test]
    fn all_scores_stay_in_bounds() {
        let long = "word ".repeat(500);
        let samples = [
            "",
            "yes",
            "Um, well, like, maybe, you know, I guess, sort of.",
            "I achieved a 40% latency reduction! We migrated the database to Postgres, \
             added caching with Redis, and scaled the API behind a load balancer. \
             Specifically, throughput doubled because the cache absorbed read traffic.",
            long.as_str(),
        ];
        for sample in samples {
            let s = scores_for(sample);
            for v in [
                s.confidence,
                s.intonation,
                s.articulation,
                s.volume_consistency,
                s.pacing,
                s.emphasis,
                s.engagement,
                s.terminology,
                s.specificity,
                s.depth,
            ] {
                assert!(v <= 5, "score {} out of bounds for {:?}", v, sample);
            }
        }
    }

    #[test]
    fn confidence_pinned_scenario() {
        // 25 words, one sentence, no fillers, no timing data, one strong
        // first-person declarative: 3.0 + 0.5 + 0.5 + 0.3 = 4.3 -> 4.
        let transcript = "I achieved a measurable improvement by redesigning the deployment \
                          process end to end and documenting each stage carefully for the \
                          whole team to reuse later";
        assert_eq!(transcript.split_whitespace().count(), 25);
        let metrics = extract_metrics(transcript, None);
        assert_eq!(metrics.filler_count, 0);
        assert_eq!(confidence_score(transcript, &metrics, false), 4);
    }

    #[test]
    fn hedging_drags_confidence_down() {
        let hedged = "Maybe, um, I think we could, like, possibly improve it. Perhaps, \
                      you know, that would work. I guess the approach was, well, probably fine.";
        let metrics = extract_metrics(hedged, None);
        let direct = "We improved it by rewriting the slowest path. The approach worked well \
                      for the project team and removed the bottleneck entirely from production.";
        let direct_metrics = extract_metrics(direct, None);
        assert!(
            confidence_score(hedged, &metrics, false)
                < confidence_score(direct, &direct_metrics, false)
        );
    }

    #[test]
    fn short_answers_cap_intonation() {
        // A single short sentence exposes fewer than three factors.
        assert!(intonation_score("Great work!") <= 4);
    }

    #[test]
    fn monotone_text_scores_below_expressive_text() {
        let monotone = "The system works fine. The system runs daily. The system stays up. \
                        The system logs data.";
        let expressive = "We doubled throughput! How did we manage it? We really focused on \
                          the critical path, and honestly it's the thing I'm proudest of.";
        assert!(intonation_score(monotone) < intonation_score(expressive));
    }

    #[test]
    fn terminology_reflects_domain_density() {
        let jargon = "We exposed an API backed by a database with caching, sharding and \
                      replication, added monitoring, and tuned latency and throughput on \
                      the deployment pipeline behind the load balancer with an index.";
        assert!(terminology_score(jargon, Domain::SoftwareEngineering) >= 3);
        assert_eq!(terminology_score("I enjoy hiking and painting.", Domain::SoftwareEngineering), 0);
    }

    #[test]
    fn domain_from_name_defaults_to_software() {
        assert_eq!(Domain::from_name("software engineering"), Domain::SoftwareEngineering);
        assert_eq!(Domain::from_name("Data Science"), Domain::DataScience);
        assert_eq!(Domain::from_name("product management"), Domain::Product);
        assert_eq!(Domain::from_name("engineering leadership"), Domain::Leadership);
        assert_eq!(Domain::from_name("unknown"), Domain::SoftwareEngineering);
    }

    #[test]
    fn specificity_counts_markers() {
        assert_eq!(specificity_score("It went well."), 1);
        // two numerics + one example marker
        assert_eq!(
            specificity_score("We cut costs 30%, for example by dropping 2 redundant services."),
            4
        );
    }

    #[test]
    fn depth_counts_complex_sentences() {
        let shallow = "It worked. Everyone was happy. We moved on.";
        assert_eq!(depth_score(shallow), 1);
        let deep = "We rewrote the ingestion service because the old one could not keep up \
                    with peak traffic during launches, which meant events were dropped. \
                    As a result of batching writes and compressing payloads (a protobuf \
                    encoding change), the pipeline finally absorbed the full production load \
                    without backpressure or manual intervention from the on-call engineer.";
        assert!(depth_score(deep) >= 3);
    }

    #[test]
    fn pacing_bands_on_wpm() {
        let metrics = Metrics {
            word_count: 130,
            wpm: Some(135.0),
            ..Metrics::default()
        };
        assert_eq!(pacing_score("irrelevant", &metrics, true), 5);

        let rushed = Metrics {
            word_count: 400,
            wpm: Some(230.0),
            ..Metrics::default()
        };
        assert!(pacing_score("irrelevant", &rushed, true) <= 3);
    }
}
