use docqa_rag::Answer;
use serde::{Deserialize, Serialize};

/// Body of `POST /upload`, tagged by `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    Ok { chunks: usize, characters: usize },
    Error { message: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub chunk_text: String,
    pub position: usize,
    pub distance: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
    /// Leading characters of the extracted document text.
    pub ocr_text: String,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.answer,
            sources: answer
                .sources
                .into_iter()
                .map(|source| SourceChunk {
                    chunk_text: source.text,
                    position: source.position,
                    distance: source.distance,
                })
                .collect(),
            ocr_text: answer.document_preview,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn upload_response_is_tagged_by_status() {
        let ok = serde_json::to_value(UploadResponse::Ok { chunks: 2, characters: 900 }).unwrap();
        assert_eq!(ok, json!({"status": "ok", "chunks": 2, "characters": 900}));

        let err = serde_json::to_value(UploadResponse::Error { message: "No text extracted".into() })
            .unwrap();
        assert_eq!(err, json!({"status": "error", "message": "No text extracted"}));
    }
}
