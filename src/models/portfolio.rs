use serde::{Deserialize, Serialize};

/// Portfolio entry: a titled PDF document attached to a freelancer résumé.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Where the uploaded document is served from.
    #[serde(rename = "pdfFile")]
    pub pdf_file: Option<String>,
}
