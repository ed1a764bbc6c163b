use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReview {
    pub id: Value,                       // integer from the backend, string tolerated
    #[serde(default)]
    pub hospital_id: Option<String>,     // "H001"
    pub hospital_name: String,
    #[serde(default)]
    pub hospital_address: Option<String>,
    pub review_text: String,
    pub timestamp: String,               // "2025-10-18T08:06:19.780796Z", offset optional
    pub overall_sentiment: String,       // "positive" | "negative" | "neutral" | "mixed"
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub star_rating: Option<i64>,
    #[serde(default)]
    pub aspects: Option<Vec<ApiAspect>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAspect {
    pub aspect: String,
    pub sentiment: String,
    #[serde(default)]
    pub star_rating: Option<i64>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAnalysis {
    pub sentiment: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub star_rating: Option<i64>,
    #[serde(default)]
    pub aspects: Vec<ApiAspect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiAnalyzeRequest<'a> {
    pub text: &'a str,
}
