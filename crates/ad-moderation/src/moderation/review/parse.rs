use serde::Deserialize;

use crate::moderation::domain::{ReviewDecision, ReviewVerdict};

const EXCERPT_LIMIT: usize = 200;

/// Review model output that does not match the `{decision, reason}` contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("review output is not a valid verdict ({detail}); raw output: {excerpt}")]
pub struct MalformedOutput {
    pub detail: String,
    pub excerpt: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    decision: ReviewDecision,
    reason: String,
}

/// Decode the model's raw text into a verdict.
///
/// A surrounding Markdown code fence is tolerated; anything else must be one
/// JSON object whose `decision` is `"Approve"` or `"Reject"` and whose
/// `reason` is a string. Extra keys are ignored.
pub fn decode_verdict(raw: &str) -> Result<ReviewVerdict, MalformedOutput> {
    let payload = strip_code_fence(raw);

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|err| malformed(raw, err.to_string()))?;
    if !value.is_object() {
        return Err(malformed(raw, "expected a JSON object".to_string()));
    }

    let RawVerdict { decision, reason } =
        serde_json::from_value(value).map_err(|err| malformed(raw, err.to_string()))?;

    Ok(ReviewVerdict { decision, reason })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line.
    let body = after_open
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or(after_open);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn malformed(raw: &str, detail: String) -> MalformedOutput {
    let excerpt = if raw.chars().count() > EXCERPT_LIMIT {
        let head: String = raw.chars().take(EXCERPT_LIMIT).collect();
        format!("{head}...")
    } else {
        raw.to_string()
    };
    MalformedOutput { detail, excerpt }
}
