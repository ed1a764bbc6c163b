use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    /// Parse a backend label. Unknown labels yield `None`.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            "mixed" => Some(Sentiment::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Mixed => "mixed",
        }
    }

    /// Capitalised label for display ("Positive").
    pub fn title(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Mixed => "Mixed",
        }
    }

    /// Star value a review's sentiment stands for when averaging hospital ratings.
    pub fn derived_stars(&self) -> f64 {
        match self {
            Sentiment::Positive => 5.0,
            Sentiment::Negative => 1.0,
            Sentiment::Neutral | Sentiment::Mixed => 3.0,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub aspect: String,              // "staff", "wait_time", ...
    pub sentiment: Sentiment,
    pub star_rating: Option<u8>,     // 1..=5
    pub score: Option<f64>,          // backend confidence for this aspect
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub hospital_id: String,
    pub hospital_name: String,
    pub hospital_address: Option<String>,
    pub review_text: String,
    pub timestamp: DateTime<Utc>,
    pub overall_sentiment: Sentiment,
    pub sentiment_score: f64,
    pub star_rating: Option<u8>,
    pub aspects: Vec<Aspect>,
}

/// Result of analysing free text without storing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub score: f64,
    pub star_rating: Option<u8>,
    pub aspects: Vec<Aspect>,
}

/// Body of a create-review request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub hospital_name: String,
    #[serde(default)]
    pub hospital_address: String,
    pub review_text: String,
}

/// Display-safe projection of a review inside a hospital profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDigest {
    pub id: String,
    pub review_text: String,
    pub timestamp: DateTime<Utc>,
    pub overall_sentiment: Sentiment,
    pub sentiment_score: f64,
    pub star_rating: Option<u8>,
    pub aspects: Vec<Aspect>,
}

impl From<&Review> for ReviewDigest {
    fn from(r: &Review) -> Self {
        ReviewDigest {
            id: r.id.clone(),
            review_text: r.review_text.clone(),
            timestamp: r.timestamp,
            overall_sentiment: r.overall_sentiment,
            sentiment_score: r.sentiment_score,
            star_rating: r.star_rating,
            aspects: r.aspects.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub mixed: usize,
}

impl SentimentBreakdown {
    pub fn record(&mut self, s: Sentiment) {
        match s {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Mixed => self.mixed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.mixed
    }

    pub fn get(&self, s: Sentiment) -> usize {
        match s {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Mixed => self.mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectSummary {
    pub aspect: String,
    pub count: usize,
    pub average_sentiment: Sentiment, // majority vote, ties go positive
    pub positive_count: usize,
    pub negative_count: usize,
    pub total_mentions: usize,        // positive_count + negative_count
    pub average_star_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalSummary {
    pub hospital_id: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub total_reviews: usize,
    pub average_score: f64,
    pub average_star_rating: f64, // sentiment-derived, see Sentiment::derived_stars
    pub sentiment_breakdown: SentimentBreakdown,
    pub common_aspects: Vec<AspectSummary>,
    pub reviews: Vec<ReviewDigest>, // newest first
}

/// Whole-list counters shown above the review list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommunityInsights {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
}

/// A hospital already present in the review list, offered by the review form's picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownHospital {
    pub name: String,
    pub address: String,
}
