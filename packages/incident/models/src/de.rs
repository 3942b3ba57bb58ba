//! Lenient deserializers for fields produced by a language model.
//!
//! Model answers (and stores written from them) carry `null` lists and
//! fractional or quoted scores. One such value must not make a whole
//! record, or the whole store, unreadable.

use serde::{Deserialize, Deserializer, de::IgnoredAny};

use crate::AUTHENTICITY_RANGE;

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Accepts integers, floats, and numeric strings, rounded and clamped into
/// [`AUTHENTICITY_RANGE`]. Anything else becomes `None`.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lenient_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let score = match ScoreValue::deserialize(deserializer)? {
        ScoreValue::Number(n) => Some(n),
        ScoreValue::Text(s) => s.trim().parse::<f64>().ok(),
        ScoreValue::Other(_) => None,
    };

    Ok(score.filter(|s| s.is_finite()).map(|s| {
        s.round().clamp(
            f64::from(*AUTHENTICITY_RANGE.start()),
            f64::from(*AUTHENTICITY_RANGE.end()),
        ) as u8
    }))
}

/// Treats `null` as an empty list.
///
/// # Errors
///
/// Fails if the value is neither `null` nor a list of strings.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
