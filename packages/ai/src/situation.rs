//! Situation blurb for the dashboard header: weather-style conditions and
//! a one-line operational insight derived from the highest-priority
//! incidents.

use serde::{Deserialize, Serialize};
use sos_map_incident_models::Incident;

use crate::AiError;
use crate::analysis::extract_json;
use crate::providers::LlmProvider;

/// How many of the top-ranked incidents are summarised for the model.
pub const DIGEST_SIZE: usize = 5;

const SYSTEM_PROMPT: &str = "You are the situation officer of a disaster response \
control room. You answer with a single, valid JSON object and nothing else.";

/// A short situation update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationUpdate {
    /// Current temperature, e.g. `"28°C"`.
    pub temperature: String,
    /// Current weather condition, e.g. `"Heavy Rain"`.
    pub condition: String,
    /// One-sentence operational insight.
    pub insight: String,
}

impl SituationUpdate {
    /// The update served when the model cannot produce one.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            temperature: "28°C".to_string(),
            condition: "Heavy Rain".to_string(),
            insight: "Situation data is temporarily unavailable. Prioritise \
                      life-threatening incidents."
                .to_string(),
        }
    }
}

/// Builds the situation prompt from the given (already ranked) incidents.
#[must_use]
pub fn build_prompt(ranked: &[Incident]) -> String {
    let digest = if ranked.is_empty() {
        "- No verified incidents reported yet.".to_string()
    } else {
        ranked
            .iter()
            .take(DIGEST_SIZE)
            .map(|incident| {
                format!(
                    "- [severity {}] {} ({})",
                    incident.severity_score,
                    incident
                        .summary
                        .as_deref()
                        .or(incident.original_message.as_deref())
                        .unwrap_or("No summary"),
                    incident.location_text.as_deref().unwrap_or("Unknown"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "The city is responding to monsoon flooding. The highest-priority \
         verified incidents right now are:\n{digest}\n\n\
         Return a JSON object with exactly these string fields:\n\
         - \"temperature\": the likely current temperature, e.g. \"28°C\"\n\
         - \"condition\": the likely current weather condition, e.g. \"Heavy Rain\"\n\
         - \"insight\": one sentence of actionable guidance for rescue coordinators"
    )
}

/// Asks the model for a situation update.
///
/// # Errors
///
/// Returns [`AiError`] if the provider call fails or its answer is not a
/// valid update.
pub async fn generate_situation_update(
    provider: &dyn LlmProvider,
    ranked: &[Incident],
) -> Result<SituationUpdate, AiError> {
    let answer = provider.complete(SYSTEM_PROMPT, &build_prompt(ranked)).await?;
    Ok(serde_json::from_str(extract_json(&answer))?)
}

/// Like [`generate_situation_update`], but falls back to
/// [`SituationUpdate::fallback`] on any failure.
pub async fn situation_update_or_fallback(
    provider: &dyn LlmProvider,
    ranked: &[Incident],
) -> SituationUpdate {
    match generate_situation_update(provider, ranked).await {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Situation update failed, serving fallback: {e}");
            SituationUpdate::fallback()
        }
    }
}
