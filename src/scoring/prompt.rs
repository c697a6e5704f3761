use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// Coaching preferences supplied by the caller; they only alter prompt
/// text, never engine behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachingPreferences {
    pub style: Option<String>,
    pub experience_level: ExperienceLevel,
    pub priorities: Vec<String>,
    pub focus_areas: Vec<String>,
    pub feedback_depth: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Junior,
    #[default]
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Lead => "lead",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "junior" | "entry" | "beginner" => ExperienceLevel::Junior,
            "senior" | "advanced" => ExperienceLevel::Senior,
            "lead" | "staff" | "principal" => ExperienceLevel::Lead,
            _ => ExperienceLevel::Mid,
        }
    }
}

/// The question an answer responds to, as read from the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionContext {
    pub id: String,
    pub text: String,
    pub hint: Option<String>,
    pub tags: Vec<String>,
}

/// Builds the system instruction: fixes the output schema and the 0-5
/// scoring rubric so the model's response is machine-parseable.
pub fn build_system_prompt(preferences: &CoachingPreferences) -> String {
    let mut prompt = String::from(
        "You are an expert interview coach scoring one candidate answer. \
         Score strictly and concretely; vague praise helps nobody.",
    );

    prompt.push_str("\n\n=== OUTPUT CONTRACT ===");
    prompt.push_str("\nReturn ONLY one JSON object, no markdown fences, no commentary:");
    prompt.push_str(
        r#"
{
  "questionAnswered": boolean,
  "answerQuality": integer 0-5,
  "whatWasRight": [2 to 4 short strings],
  "betterWording": [0 to 3 strings, each phrased exactly as "Instead of 'X', say 'Y'"],
  "dontForget": [0 to 4 strings naming expected key points missing from the answer],
  "starScore": integer 0-5,
  "impactScore": integer 0-5,
  "clarityScore": integer 0-5,
  "technicalAccuracy": integer 0-5,
  "terminologyUsage": integer 0-5,
  "tips": [exactly 5 actionable strings]
}"#,
    );

    prompt.push_str("\n\n=== SCORING RUBRIC (applies to every 0-5 field) ===");
    prompt.push_str("\n0 = absent entirely");
    prompt.push_str("\n1 = attempted but fundamentally flawed");
    prompt.push_str("\n2 = weak; major gaps an interviewer would notice");
    prompt.push_str("\n3 = adequate; passes but does not stand out");
    prompt.push_str("\n4 = strong; minor polish needed");
    prompt.push_str("\n5 = exceptional; ready for a top-tier interview");
    prompt.push_str(
        "\nstarScore measures Situation/Task/Action/Result structure. \
         impactScore measures quantified outcomes. clarityScore measures \
         logical flow. technicalAccuracy measures factual correctness. \
         terminologyUsage measures precise domain vocabulary.",
    );

    prompt.push_str("\n\n=== COACHING CONTEXT ===");
    match preferences.experience_level {
        ExperienceLevel::Junior => {
            prompt.push_str("\nCandidate level: junior.");
            prompt.push_str(
                "\n- Weight learning agility and fundamentals over depth of experience.",
            );
            prompt.push_str("\n- Flag missing basics directly; do not assume prior exposure.");
        }
        ExperienceLevel::Mid => {
            prompt.push_str("\nCandidate level: mid.");
            prompt.push_str("\n- Expect proven ownership of delivered work with trade-offs.");
            prompt.push_str("\n- Penalize answers that stay purely theoretical.");
        }
        ExperienceLevel::Senior => {
            prompt.push_str("\nCandidate level: senior.");
            prompt.push_str("\n- Expect architectural reasoning, scale and failure modes.");
            prompt.push_str("\n- Penalize missing trade-off discussion heavily.");
        }
        ExperienceLevel::Lead => {
            prompt.push_str("\nCandidate level: lead.");
            prompt.push_str("\n- Expect strategy, delegation and organizational impact.");
            prompt.push_str("\n- Penalize answers that read as individual-contributor only.");
        }
    }

    if let Some(style) = &preferences.style {
        prompt.push_str(&format!("\nCoaching style requested: {}.", style));
    }
    if !preferences.priorities.is_empty() {
        prompt.push_str(&format!(
            "\nScoring priorities (weight these dimensions hardest): {}.",
            preferences.priorities.join(", ")
        ));
    }
    if !preferences.focus_areas.is_empty() {
        prompt.push_str(&format!(
            "\nCandidate is practicing these focus areas: {}.",
            preferences.focus_areas.join(", ")
        ));
    }
    match preferences.feedback_depth.as_deref() {
        Some("brief") => prompt.push_str("\nKeep every string under 15 words."),
        Some("detailed") => {
            prompt.push_str("\nMake tips specific enough to act on without follow-up questions.")
        }
        _ => {}
    }

    prompt
}

/// Builds the user instruction: question context, (possibly truncated)
/// transcript, and compact delivery metrics.
pub fn build_user_prompt(
    question: &QuestionContext,
    transcript: &str,
    metrics: &Metrics,
    word_budget: usize,
) -> String {
    let mut prompt = format!("Interview question: {}", question.text);
    if let Some(hint) = &question.hint {
        prompt.push_str(&format!("\nExpected-answer hint: {}", hint));
    }
    if !question.tags.is_empty() {
        prompt.push_str(&format!("\nTopics: {}", question.tags.join(", ")));
    }

    prompt.push_str("\n\nCandidate's transcribed answer:\n\"\"\"\n");
    prompt.push_str(&truncate_transcript(transcript, word_budget));
    prompt.push_str("\n\"\"\"");

    prompt.push_str(&format!(
        "\n\nDelivery metrics: {} words, {} fillers ({:.1}%), {} long pauses",
        metrics.word_count, metrics.filler_count, metrics.filler_rate, metrics.long_pauses
    ));
    if let Some(wpm) = metrics.wpm {
        prompt.push_str(&format!(", {:.0} words per minute", wpm));
    }

    prompt
}

/// Truncates long transcripts to `word_budget` words, keeping the first
/// ~75% and last ~25% with an explicit omission marker. The opening framing
/// and the closing conclusion are the two most information-dense regions of
/// a spoken answer.
pub fn truncate_transcript(transcript: &str, word_budget: usize) -> String {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    if words.len() <= word_budget || word_budget == 0 {
        return words.join(" ");
    }

    let head = word_budget * 3 / 4;
    let tail = word_budget - head;
    let omitted = words.len() - word_budget;

    format!(
        "{} [... {} words omitted ...] {}",
        words[..head].join(" "),
        omitted,
        words[words.len() - tail..].join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transcripts_are_not_truncated() {
        let text = "a short answer that fits";
        assert_eq!(truncate_transcript(text, 400), text);
    }

    #[test]
    fn long_transcripts_keep_head_and_tail_with_marker() {
        let words: Vec<String> = (0..500).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");
        let truncated = truncate_transcript(&text, 400);

        assert!(truncated.starts_with("w0 w1"));
        assert!(truncated.ends_with("w498 w499"));
        assert!(truncated.contains("[... 100 words omitted ...]"));
        // head 300 + tail 100
        assert!(truncated.contains("w299"));
        assert!(!truncated.contains("w300 "));
        assert!(truncated.contains("w400"));
    }

    #[test]
    fn system_prompt_fixes_the_schema_and_level() {
        let prefs = CoachingPreferences {
            experience_level: ExperienceLevel::Senior,
            priorities: vec!["impact".to_string()],
            ..CoachingPreferences::default()
        };
        let prompt = build_system_prompt(&prefs);
        assert!(prompt.contains("questionAnswered"));
        assert!(prompt.contains("exactly 5 actionable strings"));
        assert!(prompt.contains("Candidate level: senior"));
        assert!(prompt.contains("impact"));
    }

    #[test]
    fn user_prompt_embeds_question_and_metrics() {
        let question = QuestionContext {
            id: "q1".to_string(),
            text: "Tell me about a caching problem you solved.".to_string(),
            hint: Some("Expect invalidation strategy".to_string()),
            tags: vec!["caching".to_string()],
        };
        let metrics = Metrics {
            word_count: 42,
            filler_count: 2,
            filler_rate: 4.8,
            wpm: Some(132.0),
            long_pauses: 1,
        };
        let prompt = build_user_prompt(&question, "my answer text here at least", &metrics, 400);
        assert!(prompt.contains("caching problem"));
        assert!(prompt.contains("Expect invalidation strategy"));
        assert!(prompt.contains("42 words"));
        assert!(prompt.contains("132 words per minute"));
    }

    #[test]
    fn experience_level_from_name_defaults_to_mid() {
        assert_eq!(ExperienceLevel::from_name("Entry"), ExperienceLevel::Junior);
        assert_eq!(ExperienceLevel::from_name("staff"), ExperienceLevel::Lead);
        assert_eq!(ExperienceLevel::from_name("whatever"), ExperienceLevel::Mid);
    }
}
