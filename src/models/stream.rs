use serde::{ Serialize, Deserialize };
use serde_json::Value;

use super::chat::SourceRef;
use crate::error::ParseError;

/// One newline-delimited record of an `/ask` response body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum StreamRecord {
    #[serde(rename = "metadata")] Metadata {
        sources: Vec<SourceRef>,
    },
    #[serde(rename = "chunk")] Chunk {
        content: String,
    },
    /// A record whose `type` this client does not know about.
    #[serde(skip)] Unknown {
        kind: String,
    },
}

impl StreamRecord {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(line)?;
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => {
                return Err(ParseError::MissingType);
            }
        };

        match kind.as_str() {
            "metadata" | "chunk" => Ok(serde_json::from_value(value)?),
            _ => Ok(StreamRecord::Unknown { kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chunk_and_metadata_records() {
        assert_eq!(
            StreamRecord::parse(r#"{"type":"chunk","content":"Paris"}"#).unwrap(),
            StreamRecord::Chunk { content: "Paris".into() }
        );
        assert_eq!(
            StreamRecord::parse(
                r#"{"type":"metadata","sources":[{"chunk_id":2,"pdf_id":"pdf_1"}]}"#
            ).unwrap(),
            StreamRecord::Metadata {
                sources: vec![SourceRef { chunk_id: 2, pdf_id: "pdf_1".into() }],
            }
        );
    }

    #[test]
    fn unknown_types_are_kept_as_unknown() {
        assert_eq!(
            StreamRecord::parse(r#"{"type":"usage","tokens":12}"#).unwrap(),
            StreamRecord::Unknown { kind: "usage".into() }
        );
    }

    #[test]
    fn rejects_non_json_and_untyped_records() {
        assert!(matches!(StreamRecord::parse("not json"), Err(ParseError::Json(_))));
        assert!(matches!(StreamRecord::parse(r#"{"content":"x"}"#), Err(ParseError::MissingType)));
        assert!(matches!(StreamRecord::parse(r#"[1,2]"#), Err(ParseError::MissingType)));
        assert!(matches!(StreamRecord::parse(r#"{"type":"chunk"}"#), Err(ParseError::Json(_))));
    }
}
