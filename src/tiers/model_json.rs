//! JSON extraction for model replies.
//!
//! Providers wrap structured output in prose or code fences often enough that
//! parsing the raw reply directly is not reliable. The extractor finds the
//! first top-level JSON array in the reply and deserializes that.

use serde::de::DeserializeOwned;

use super::error::ModelError;

/// Deserializes the first JSON array found in a model reply.
pub(crate) fn parse_model_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, ModelError> {
    let start = raw
        .find('[')
        .ok_or_else(|| ModelError::MalformedResponse("no JSON array in reply".to_string()))?;
    let end = raw
        .rfind(']')
        .ok_or_else(|| ModelError::MalformedResponse("unterminated JSON array".to_string()))?;

    if end < start {
        return Err(ModelError::MalformedResponse(
            "unterminated JSON array".to_string(),
        ));
    }

    serde_json::from_str(&raw[start..=end])
        .map_err(|e| ModelError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array() {
        let parsed: Vec<u32> = parse_model_array("[1, 2, 3]").unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn parses_fenced_array() {
        let raw = "Here is the analysis:\n```json\n[\"a\", \"b\"]\n```\nDone.";
        let parsed: Vec<String> = parse_model_array(raw).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn rejects_reply_without_array() {
        let result: Result<Vec<u32>, _> = parse_model_array("no structure here");
        assert!(result.is_err());
    }
}
