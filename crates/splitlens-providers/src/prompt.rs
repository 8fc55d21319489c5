//! Prompt template and model-output cleanup.

use splitlens_core::ExperimentRecord;

use crate::error::CompletionError;

/// Prompt used by the connectivity smoke test.
pub const PING_PROMPT: &str = "Say 'OK'";

const ANALYST_PREAMBLE: &str = "You are an expert growth analyst. Analyze this A/B test \
experiment and provide comprehensive insights.";

const OUTPUT_SCHEMA: &str = r#"{
  "executive_summary": "2-3 sentence summary of results and recommendation",
  "statistical_results": {
    "primary_metric": "conversion_rate",
    "winner": "variant_a or control or inconclusive",
    "lift": "percentage improvement",
    "confidence_level": "95% or 90% or below 90%",
    "is_significant": true,
    "sample_size_adequate": true
  },
  "key_insights": [
    "Insight 1 with specific numbers",
    "Insight 2 with specific numbers",
    "Insight 3 with specific numbers"
  ],
  "secondary_metrics": [
    {
      "metric": "avg_session_duration",
      "impact": "positive/negative/neutral",
      "change": "percentage or absolute change",
      "note": "brief explanation"
    }
  ],
  "risks_and_caveats": [
    "Important caveat 1",
    "Important caveat 2"
  ],
  "recommended_action": "ship/iterate/kill with brief rationale",
  "next_experiments": [
    "Suggested follow-up experiment 1",
    "Suggested follow-up experiment 2"
  ],
  "report_narrative": "A comprehensive 3-4 paragraph narrative report"
}"#;

/// Build the single user message sent for one analysis.
pub fn build_analysis_prompt(experiment: &ExperimentRecord) -> Result<String, CompletionError> {
    let data = serde_json::to_string_pretty(experiment)
        .map_err(|e| CompletionError::Encode(e.to_string()))?;

    Ok(format!(
        "{ANALYST_PREAMBLE}\n\n\
         EXPERIMENT DATA:\n{data}\n\n\
         Provide your analysis in the following JSON structure. Respond with a single \
         valid JSON object only: no markdown, no code fences, no text before or after it.\n\n\
         {OUTPUT_SCHEMA}"
    ))
}

/// Strip a markdown code fence wrapped around the model's JSON, if any.
///
/// Handles ```` ```json ```` / ```` ``` ```` openers, a missing closing fence,
/// and chatter before the opening fence. Text that already starts with `{`
/// is only trimmed: backticks inside it belong to string values.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    // Skip the fence and its language tag. The body may start on the same line.
    let body = trimmed[open + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());

    // The wrapping fence closes at the last marker; earlier ones are content.
    let body = match body.rfind("```") {
        Some(close) => &body[..close],
        None => body,
    };

    body.trim()
}
