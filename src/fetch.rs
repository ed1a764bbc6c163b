use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::api_types::*;
use crate::models::*;

/// Thin client over the review backend's three endpoints.
pub struct ReviewApi {
    client: Client,
    base: Url,
}

impl ReviewApi {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let base = parse_base(api_base)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Building HTTP client")?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Joining {} onto {}", path, self.base))
    }

    /// All reviews, newest first. Records that cannot be read are skipped.
    pub async fn fetch_reviews(&self) -> Result<Vec<Review>> {
        let url = self.endpoint("api/reviews")?;
        let start = std::time::Instant::now();
        debug!("Fetching reviews - url={}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        let resp = check_status(resp, "fetch reviews")?;

        // records are decoded one at a time in normalize_reviews
        let raw: Vec<Value> = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", url))?;

        let fetched = raw.len();
        let reviews = normalize_reviews(raw);
        info!(
            "Review fetch completed - duration={:.2}s, fetched={}, usable={}",
            start.elapsed().as_secs_f32(),
            fetched,
            reviews.len()
        );
        Ok(reviews)
    }

    /// Submit a review; the backend analyses it and answers with the stored record.
    pub async fn create_review(&self, new_review: &NewReview) -> Result<Review> {
        let url = self.endpoint("api/reviews")?;
        let start = std::time::Instant::now();
        debug!(
            "Creating review - hospital={}, text_length={} chars",
            new_review.hospital_name,
            new_review.review_text.len()
        );

        let resp = self
            .client
            .post(url.clone())
            .json(new_review)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        let resp = check_status(resp, "create review")?;

        let raw: ApiReview = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", url))?;
        let review = review_from_api(raw)?;

        info!(
            "Review created - id={}, hospital={}, sentiment={}, duration={:.2}s",
            review.id,
            review.hospital_name,
            review.overall_sentiment,
            start.elapsed().as_secs_f32()
        );
        Ok(review)
    }

    /// Analyse text without storing anything.
    pub async fn analyze_text(&self, text: &str) -> Result<Analysis> {
        let url = self.endpoint("api/analyze")?;
        let start = std::time::Instant::now();
        debug!("Analyze call starting - text_length={} chars", text.len());

        let resp = self
            .client
            .post(url.clone())
            .json(&ApiAnalyzeRequest { text })
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        let resp = check_status(resp, "analyze text")?;

        let raw: ApiAnalysis = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", url))?;
        let analysis = analysis_from_api(raw);

        info!(
            "Analyze call completed - duration={:.2}s, sentiment={}, aspects={}",
            start.elapsed().as_secs_f32(),
            analysis.sentiment,
            analysis.aspects.len()
        );
        Ok(analysis)
    }

    /// Submit many reviews, `batch_size` requests in flight at a time.
    /// Results line up with the input order.
    pub async fn create_reviews(&self, drafts: &[NewReview], batch_size: usize) -> Vec<Result<Review>> {
        let batch_size = batch_size.max(1);
        let total = drafts.len();
        let mut out = Vec::with_capacity(total);

        for (n, batch) in drafts.chunks(batch_size).enumerate() {
            let batch_start = std::time::Instant::now();
            let tasks = batch.iter().map(|d| self.create_review(d));
            let results = futures::future::join_all(tasks).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            out.extend(results);

            info!(
                "Import progress: {}/{} | Batch {} of {}: {:.1}s, failed={}",
                out.len(),
                total,
                n + 1,
                total.div_ceil(batch_size),
                batch_start.elapsed().as_secs_f32(),
                failed
            );
        }
        out
    }
}

fn parse_base(api_base: &str) -> Result<Url> {
    // Url::join drops the last path segment unless the base ends with '/'
    let with_slash = if api_base.ends_with('/') {
        api_base.to_string()
    } else {
        format!("{}/", api_base)
    };
    let base = Url::parse(&with_slash).with_context(|| format!("Invalid API base URL: {}", api_base))?;
    if !matches!(base.scheme(), "http" | "https") {
        bail!("API base URL must be http or https: {}", api_base);
    }
    Ok(base)
}

fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        bail!("Failed to {}: {}", what, status);
    }
    Ok(resp)
}

/// Convert wire records, dropping (and logging) the ones that do not decode
/// or lack a readable timestamp. Output is sorted newest first.
pub fn normalize_reviews(raw: Vec<Value>) -> Vec<Review> {
    let mut out: Vec<Review> = raw
        .into_iter()
        .filter_map(|v| match decode_review(v) {
            Ok(review) => Some(review),
            Err(e) => {
                warn!("Skipping review - reason={:#}", e);
                None
            }
        })
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

fn decode_review(v: Value) -> Result<Review> {
    let id = v.get("id").map(id_text).unwrap_or_else(|| "?".to_string());
    let raw: ApiReview =
        serde_json::from_value(v).with_context(|| format!("review {} does not match the review shape", id))?;
    review_from_api(raw)
}

pub fn review_from_api(r: ApiReview) -> Result<Review> {
    let id = id_text(&r.id);
    let timestamp = parse_timestamp(&r.timestamp)
        .with_context(|| format!("review {} has unreadable timestamp {:?}", id, r.timestamp))?;

    Ok(Review {
        hospital_id: r
            .hospital_id
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| format!("H{:0>3}", id)),
        hospital_name: r.hospital_name,
        hospital_address: r.hospital_address.filter(|a| !a.trim().is_empty()),
        review_text: r.review_text,
        timestamp,
        overall_sentiment: sentiment_or_neutral(&r.overall_sentiment),
        sentiment_score: r.sentiment_score,
        star_rating: stars(r.star_rating),
        aspects: r.aspects.unwrap_or_default().into_iter().map(aspect_from_api).collect(),
        id,
    })
}

pub fn analysis_from_api(a: ApiAnalysis) -> Analysis {
    Analysis {
        sentiment: sentiment_or_neutral(&a.sentiment),
        score: a.score,
        star_rating: stars(a.star_rating),
        aspects: a.aspects.into_iter().map(aspect_from_api).collect(),
    }
}

fn aspect_from_api(a: ApiAspect) -> Aspect {
    Aspect {
        sentiment: sentiment_or_neutral(&a.sentiment),
        star_rating: stars(a.star_rating),
        score: a.score,
        aspect: a.aspect,
    }
}

fn id_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn sentiment_or_neutral(label: &str) -> Sentiment {
    Sentiment::from_label(label).unwrap_or_else(|| {
        warn!("Unknown sentiment label - label={:?}, using=neutral", label);
        Sentiment::Neutral
    })
}

fn stars(v: Option<i64>) -> Option<u8> {
    v.filter(|s| (1..=5).contains(s)).map(|s| s as u8)
}

/// RFC 3339, or an ISO timestamp without offset which is taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .with_context(|| format!("not an ISO 8601 timestamp: {}", s))?;
    Ok(naive.and_utc())
}
