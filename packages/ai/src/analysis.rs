//! SOS message analysis: structured field extraction plus an authenticity
//! assessment, in one model call.
//!
//! The model is asked for a single JSON object. Models frequently wrap
//! that object in Markdown code fences or add a sentence around it, so
//! [`extract_json`] strips that before parsing. Anything that still fails
//! to parse is an analysis failure; callers must treat it as "no data".

use serde::Deserialize;
use sos_map_incident_models::de::{lenient_score, null_as_empty};
use sos_map_incident_models::{NeedTypes, UNKNOWN_LOCATION};

use crate::AiError;
use crate::providers::LlmProvider;

const SYSTEM_PROMPT: &str = "You are a sophisticated AI for a disaster response system. \
You analyze incoming SOS messages for data extraction and authenticity assessment. \
You always answer with a single, valid JSON object and nothing else.";

/// Structured fields extracted from an SOS message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SosAnalysis {
    /// Physical location mentioned in the message, or `"Unknown"`.
    #[serde(default)]
    pub location: Option<String>,
    /// `Life-threatening`, `Urgent`, or `Minor`.
    #[serde(default)]
    pub urgency: Option<String>,
    /// Need-type label(s).
    #[serde(default)]
    pub need_type: Option<NeedTypes>,
    /// One-sentence summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// 1 (very likely fake) to 10 (very likely authentic).
    #[serde(default, deserialize_with = "lenient_score")]
    pub authenticity_score: Option<u8>,
    /// One-sentence explanation of the authenticity score.
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Suspicious keywords or patterns detected.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub flags: Vec<String>,
}

impl SosAnalysis {
    /// The extracted location, unless it is missing, blank, or
    /// `"Unknown"`.
    #[must_use]
    pub fn known_location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty() && !loc.eq_ignore_ascii_case(UNKNOWN_LOCATION))
    }
}

/// Builds the analysis prompt for `message`.
#[must_use]
pub fn build_prompt(message: &str) -> String {
    format!(
        r#"Analyze the incoming SOS message with two goals: data extraction and authenticity assessment.

**Part 1: Data Extraction**
Extract the following fields:
1. **location**: The specific physical location (e.g., "Andheri station", "near Nagpur bridge"). If none, return "Unknown".
2. **urgency**: Classify as 'Life-threatening', 'Urgent', or 'Minor'.
3. **need_type**: Classify as 'Rescue', 'Medical', 'Food', 'Shelter', 'Supplies', 'Infrastructure'.
4. **summary**: A one-sentence summary of the request.

**Part 2: Authenticity Assessment**
Critically analyze the message content to determine its likely authenticity. Provide the following:
1. **authenticity_score**: An integer score from 1 (very likely fake/spam) to 10 (very likely authentic).
2. **reasoning**: A brief, one-sentence explanation for your score. Consider factors like specificity, vagueness, emotional tone, and presence of spam-like content.
3. **flags**: A list of any suspicious keywords or patterns detected (e.g., "vague location", "spam link", "generic plea"). If none, return an empty list [].

**Return the output ONLY as a single, valid JSON object.**

**Message:** "{message}"

**JSON Output:**"#
    )
}

/// Strips code fences and surrounding prose from a model answer, leaving
/// the outermost JSON object.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim(),
    }
}

/// Parses a model answer into an [`SosAnalysis`].
///
/// # Errors
///
/// Returns [`AiError::Json`] if no valid analysis object can be found.
pub fn parse_analysis(text: &str) -> Result<SosAnalysis, AiError> {
    Ok(serde_json::from_str(extract_json(text))?)
}

/// Runs the full analysis of one SOS message.
///
/// # Errors
///
/// Returns [`AiError`] if the provider call fails or its answer cannot be
/// parsed.
pub async fn analyze_message(
    provider: &dyn LlmProvider,
    message: &str,
) -> Result<SosAnalysis, AiError> {
    let answer = provider.complete(SYSTEM_PROMPT, &build_prompt(message)).await?;

    parse_analysis(&answer).inspect_err(|e| {
        log::debug!("Unparseable analysis answer ({e}): {answer}");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    const ANSWER: &str = r#"{
        "location": "Andheri station",
        "urgency": "Life-threatening",
        "need_type": "Rescue",
        "summary": "People stranded on a roof as water rises.",
        "authenticity_score": 9,
        "reasoning": "Specific location and plausible detail.",
        "flags": []
    }"#;

    #[test]
    fn parses_fenced_answer() {
        let fenced = format!("```json\n{ANSWER}\n```");
        let analysis = parse_analysis(&fenced).unwrap();
        assert_eq!(analysis.known_location(), Some("Andheri station"));
        assert_eq!(analysis.urgency.as_deref(), Some("Life-threatening"));
        assert_eq!(analysis.need_type, Some(NeedTypes::from("Rescue")));
        assert_eq!(analysis.authenticity_score, Some(9));
        assert!(analysis.flags.is_empty());
    }

    #[test]
    fn parses_answer_wrapped_in_prose() {
        let wrapped = format!("Here is the analysis:\n{ANSWER}\nLet me know if you need more.");
        assert!(parse_analysis(&wrapped).is_ok());
    }

    #[test]
    fn malformed_answer_is_an_error() {
        assert!(matches!(
            parse_analysis("I cannot help with that."),
            Err(AiError::Json(_))
        ));
        assert!(matches!(
            parse_analysis("```json\n{\"location\": \n```"),
            Err(AiError::Json(_))
        ));
    }

    #[test]
    fn lenient_authenticity_and_flags() {
        let analysis = parse_analysis(
            r#"{"authenticity_score": "7.6", "flags": null, "location": "Unknown"}"#,
        )
        .unwrap();
        assert_eq!(analysis.authenticity_score, Some(8));
        assert!(analysis.flags.is_empty());
        assert_eq!(analysis.known_location(), None);

        let analysis = parse_analysis(r#"{"authenticity_score": 42}"#).unwrap();
        assert_eq!(analysis.authenticity_score, Some(10));

        let analysis = parse_analysis(r#"{"authenticity_score": "high"}"#).unwrap();
        assert_eq!(analysis.authenticity_score, None);
    }

    #[test]
    fn prompt_embeds_message() {
        let prompt = build_prompt("Water rising at Dadar");
        assert!(prompt.contains("**Message:** \"Water rising at Dadar\""));
    }

    #[tokio::test]
    async fn analyze_message_uses_provider_answer() {
        let provider = CannedProvider(ANSWER);
        let analysis = analyze_message(&provider, "Stuck on the roof").await.unwrap();
        assert_eq!(analysis.summary.as_deref(), Some("People stranded on a roof as water rises."));

        let provider = CannedProvider("no json here");
        assert!(analyze_message(&provider, "Stuck on the roof").await.is_err());
    }
}
