use serde::{ Serialize, Deserialize };

/// Document descriptor returned by the backend for an uploaded PDF.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfHandle {
    #[serde(alias = "pdf_id")]
    pub id: String,
    #[serde(default, alias = "filename")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PdfList {
    #[serde(default)]
    pub pdfs: Vec<PdfHandle>,
}

/// Body of `GET /pdfs/{pdf_id}/chunks/{chunk_id}`. The backend owns the
/// exact shape, so anything beyond the text is kept as raw JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkDetail {
    #[serde(default)]
    pub pdf_id: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<i64>,
    #[serde(default, alias = "content")]
    pub text: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
