//! Mines the scoring client's free-text suggestions for recurring
//! structured patterns: terminology corrections, forgotten key points, and
//! score-derived mistake patterns.
//!
//! Free-text mining is fragile by nature, so the recognized phrasings live
//! in an ordered rule list; adding a new phrasing never touches aggregation
//! logic.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scoring::AnalysisResult;

/// Raw suggestion sentences kept as evidence per correction.
pub const MAX_EXAMPLES_PER_CORRECTION: usize = 3;

/// Sub-scores below this emit a named mistake pattern.
const LOW_SCORE: u8 = 3;

/// One answered item: the question's identity and tags plus its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub tags: Vec<String>,
    pub analysis: AnalysisResult,
}

/// A mined incorrect→correct term pair, keyed case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminologyCorrection {
    pub incorrect_term: String,
    pub correct_term: String,
    pub frequency: u32,
    pub question_ids: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub examples: Vec<String>,
}

/// An expected key point the model judged missing, keyed by normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgottenPoint {
    pub point_text: String,
    pub frequency: u32,
    pub question_ids: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

/// A generic mistake derived from consistently low sub-scores or from
/// wording suggestions no correction rule recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakePattern {
    pub pattern: String,
    pub frequency: u32,
    pub example: Option<String>,
}

/// The miner's three frequency-ranked collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinedPatterns {
    pub mistakes: Vec<MistakePattern>,
    pub corrections: Vec<TerminologyCorrection>,
    pub forgotten_points: Vec<ForgottenPoint>,
}

/// One recognized correction phrasing. `swapped` marks phrasings that put
/// the corrected term first, whose captured groups must be swapped before
/// storage.
struct CorrectionRule {
    regex: Regex,
    swapped: bool,
}

impl CorrectionRule {
    /// Pure extraction: `suggestion -> Option<(incorrect, correct)>`.
    fn apply(&self, suggestion: &str) -> Option<(String, String)> {
        let caps = self.regex.captures(suggestion)?;
        let first = caps.get(1)?.as_str().trim();
        let second = caps.get(2)?.as_str().trim();
        if first.is_empty() || second.is_empty() || first.eq_ignore_ascii_case(second) {
            return None;
        }
        if self.swapped {
            Some((second.to_string(), first.to_string()))
        } else {
            Some((first.to_string(), second.to_string()))
        }
    }
}

lazy_static! {
    static ref CORRECTION_RULES: Vec<CorrectionRule> = vec![
        // Instead of 'X', say 'Y'
        CorrectionRule {
            regex: Regex::new(
                r#"(?i)instead of\s+['"]([^'"]+)['"],?\s*(?:say|use|try)\s+['"]([^'"]+)['"]"#
            )
            .unwrap(),
            swapped: false,
        },
        // You said: 'X'. Better: 'Y'
        CorrectionRule {
            regex: Regex::new(
                r#"(?i)you said:?\s*['"]([^'"]+)['"]\.?\s*better:?\s*['"]([^'"]+)['"]"#
            )
            .unwrap(),
            swapped: false,
        },
        // Better: 'Y' (instead of 'X') -- corrected term comes first
        CorrectionRule {
            regex: Regex::new(
                r#"(?i)better:?\s*['"]([^'"]+)['"]\s*\(instead of\s+['"]([^'"]+)['"]\)"#
            )
            .unwrap(),
            swapped: true,
        },
    ];

    // Suggestions shaped like corrections that no rule matched still count
    // as a generic wording mistake instead of being discarded.
    static ref WORDING_SHAPED: Regex = Regex::new(r"(?i)\b(instead of|better:)").unwrap();
}

const IMPRECISE_WORDING: &str = "Could use more precise wording";

fn score_patterns(analysis: &AnalysisResult) -> Vec<&'static str> {
    let mut patterns = Vec::new();
    if analysis.technical_accuracy < LOW_SCORE {
        patterns.push("Lacks technical depth or accuracy");
    }
    if analysis.terminology_usage < LOW_SCORE {
        patterns.push("Uses imprecise or incorrect terminology");
    }
    if analysis.clarity_score < LOW_SCORE {
        patterns.push("Explanations are hard to follow");
    }
    if analysis.impact_score < LOW_SCORE {
        patterns.push("Does not highlight impact or results");
    }
    if analysis.star_score < LOW_SCORE {
        patterns.push("Answers are missing STAR structure");
    }
    if !analysis.question_answered {
        patterns.push("Does not directly answer the question asked");
    }
    patterns
}

/// Scans one session's ordered analysis results and folds matches into
/// frequency-ranked collections, capped at `limit` entries each.
pub struct PatternMiner {
    limit: usize,
}

impl PatternMiner {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn mine(&self, records: &[AnswerRecord]) -> MinedPatterns {
        let mut mistakes: BTreeMap<String, MistakePattern> = BTreeMap::new();
        let mut corrections: BTreeMap<String, TerminologyCorrection> = BTreeMap::new();
        let mut forgotten: BTreeMap<String, ForgottenPoint> = BTreeMap::new();

        for record in records {
            for pattern in score_patterns(&record.analysis) {
                bump_mistake(
                    &mut mistakes,
                    pattern,
                    Some(format!("question {}", record.question_id)),
                );
            }

            for suggestion in &record.analysis.better_wording {
                match CORRECTION_RULES.iter().find_map(|rule| rule.apply(suggestion)) {
                    Some((incorrect, correct)) => {
                        let key =
                            format!("{}->{}", incorrect.to_lowercase(), correct.to_lowercase());
                        let entry =
                            corrections
                                .entry(key)
                                .or_insert_with(|| TerminologyCorrection {
                                    incorrect_term: incorrect,
                                    correct_term: correct,
                                    frequency: 0,
                                    question_ids: BTreeSet::new(),
                                    tags: BTreeSet::new(),
                                    examples: Vec::new(),
                                });
                        entry.frequency += 1;
                        entry.question_ids.insert(record.question_id.clone());
                        entry.tags.extend(record.tags.iter().cloned());
                        if entry.examples.len() < MAX_EXAMPLES_PER_CORRECTION
                            && !entry.examples.contains(suggestion)
                        {
                            entry.examples.push(suggestion.clone());
                        }
                    }
                    None if WORDING_SHAPED.is_match(suggestion) => {
                        bump_mistake(&mut mistakes, IMPRECISE_WORDING, Some(suggestion.clone()));
                    }
                    None => {}
                }
            }

            for point in &record.analysis.dont_forget {
                let normalized = point.trim().to_lowercase();
                if normalized.is_empty() {
                    continue;
                }
                let entry = forgotten.entry(normalized).or_insert_with(|| ForgottenPoint {
                    point_text: point.trim().to_string(),
                    frequency: 0,
                    question_ids: BTreeSet::new(),
                    tags: BTreeSet::new(),
                });
                entry.frequency += 1;
                entry.question_ids.insert(record.question_id.clone());
                entry.tags.extend(record.tags.iter().cloned());
            }
        }

        MinedPatterns {
            mistakes: ranked(mistakes, self.limit, |m| m.frequency),
            corrections: ranked(corrections, self.limit, |c| c.frequency),
            forgotten_points: ranked(forgotten, self.limit, |p| p.frequency),
        }
    }
}

fn bump_mistake(
    mistakes: &mut BTreeMap<String, MistakePattern>,
    pattern: &str,
    example: Option<String>,
) {
    let entry = mistakes
        .entry(pattern.to_string())
        .or_insert_with(|| MistakePattern {
            pattern: pattern.to_string(),
            frequency: 0,
            example: None,
        });
    entry.frequency += 1;
    if entry.example.is_none() {
        entry.example = example;
    }
}

/// Sorts by frequency descending (map key ascending on ties, for
/// determinism) and truncates to the cap.
fn ranked<V>(map: BTreeMap<String, V>, limit: usize, frequency: impl Fn(&V) -> u32) -> Vec<V> {
    let mut entries: Vec<(String, V)> = map.into_iter().collect();
    entries.sort_by(|a, b| frequency(&b.1).cmp(&frequency(&a.1)).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().map(|(_, v)| v).take(limit).collect()
}
