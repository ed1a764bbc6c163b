use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::models::{Analysis, Aspect, CommunityInsights, HospitalSummary, Review, ReviewDigest, Sentiment};
use crate::view::{PageView, ViewState};

pub const TRUNCATE_AT: usize = 300;

pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn stars_avg(avg: f64) -> String {
    stars(avg.round().clamp(0.0, 5.0) as u8)
}

/// Colour bucket for a star value: 4+ positive, 3+ neutral, below that negative.
pub fn star_tone(rating: f64) -> &'static str {
    if rating >= 4.0 {
        "positive"
    } else if rating >= 3.0 {
        "neutral"
    } else {
        "negative"
    }
}

fn sentiment_mark(s: Sentiment) -> &'static str {
    match s {
        Sentiment::Positive => "▲",
        Sentiment::Negative => "▼",
        Sentiment::Neutral | Sentiment::Mixed => "●",
    }
}

pub fn format_date(ts: DateTime<Utc>, tz: &Tz) -> String {
    ts.with_timezone(tz).format("%b %-d, %Y %H:%M %Z").to_string()
}

fn truncate(text: &str, full: bool) -> String {
    if full || text.chars().count() <= TRUNCATE_AT {
        return text.to_string();
    }
    let cut: String = text.chars().take(TRUNCATE_AT).collect();
    format!("{}…", cut.trim_end())
}

fn aspect_line(aspects: &[Aspect]) -> String {
    aspects
        .iter()
        .map(|a| match a.star_rating {
            Some(s) => format!("{} {} ({}★)", sentiment_mark(a.sentiment), a.aspect, s),
            None => format!("{} {}", sentiment_mark(a.sentiment), a.aspect),
        })
        .join("  ")
}

pub fn render_review_card(r: &Review, tz: &Tz, full: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", r.hospital_name));
    if let Some(addr) = &r.hospital_address {
        out.push_str(&format!("  {}\n", addr));
    }
    out.push_str(&format!(
        "  {} {} {:.2}",
        sentiment_mark(r.overall_sentiment),
        r.overall_sentiment.title(),
        r.sentiment_score
    ));
    if let Some(s) = r.star_rating {
        out.push_str(&format!("  {} {}/5", stars(s), s));
    }
    out.push_str(&format!("  · {}\n", format_date(r.timestamp, tz)));
    out.push_str(&format!("\n  {}\n", truncate(&r.review_text, full)));
    if !r.aspects.is_empty() {
        out.push_str(&format!("\n  {}\n", aspect_line(&r.aspects)));
    }
    out
}

pub fn render_insights(i: &CommunityInsights) -> String {
    format!(
        "Community Insights: {} reviews · {} positive · {} negative\n",
        i.total, i.positive, i.negative
    )
}

pub fn render_review_page(pv: &PageView<'_>, state: &ViewState, tz: &Tz, full: bool) -> String {
    let mut out = String::new();
    if pv.total == 0 {
        out.push_str("No reviews match your filters.\n");
        if state.has_active_filters() {
            out.push_str("Run without --search/--hospital/--sentiment to clear filters.\n");
        }
        return out;
    }

    for r in &pv.items {
        out.push_str(&render_review_card(r, tz, full));
        out.push_str(&format!("{}\n", "─".repeat(60)));
    }

    let pages = pv
        .window
        .iter()
        .map(|&p| if p == pv.page { format!("[{}]", p) } else { p.to_string() })
        .join(" ");
    out.push_str(&format!(
        "{}-{} of {} · page {} of {} · {} · {} per page\n",
        pv.range_start, pv.range_end, pv.total, pv.page, pv.total_pages, pages, state.page_size
    ));
    out
}

pub fn render_hospital_table(summaries: &[HospitalSummary]) -> String {
    let width = summaries
        .iter()
        .map(|h| h.hospital_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Hospital".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:>7}  {:>6}  {:>5}  {:>4}  {:>4}  {:>4}\n",
        "Hospital", "Reviews", "Score", "Stars", "Pos", "Neg", "Neu",
        width = width
    ));
    for h in summaries {
        let b = &h.sentiment_breakdown;
        out.push_str(&format!(
            "{:<width$}  {:>7}  {:>6.2}  {:>5.1}  {:>4}  {:>4}  {:>4}\n",
            h.hospital_name,
            h.total_reviews,
            h.average_score,
            h.average_star_rating,
            b.positive,
            b.negative,
            b.neutral + b.mixed,
            width = width
        ));
    }
    out
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn render_digest(md: &mut String, r: &ReviewDigest, tz: &Tz) {
    md.push_str(&format!(
        "### {} {} ({:.2}) · {}\n",
        sentiment_mark(r.overall_sentiment),
        r.overall_sentiment.title(),
        r.sentiment_score,
        format_date(r.timestamp, tz)
    ));
    if let Some(s) = r.star_rating {
        md.push_str(&format!("{} {}/5\n\n", stars(s), s));
    }
    md.push_str(&format!("{}\n", truncate(&r.review_text, false)));
    if !r.aspects.is_empty() {
        md.push_str(&format!("\n{}\n", aspect_line(&r.aspects)));
    }
    md.push('\n');
}

pub fn render_hospital_profile(h: &HospitalSummary, tz: &Tz) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", h.hospital_name));
    if !h.hospital_address.is_empty() {
        md.push_str(&format!("{}\n\n", h.hospital_address));
    }
    if h.average_star_rating > 0.0 {
        md.push_str(&format!(
            "**{}** {:.1}/5 stars ({}) · {} reviews · average score {:.2}\n\n",
            stars_avg(h.average_star_rating),
            h.average_star_rating,
            star_tone(h.average_star_rating),
            h.total_reviews,
            h.average_score
        ));
    }

    md.push_str("## Sentiment Breakdown\n");
    let b = &h.sentiment_breakdown;
    for s in [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative, Sentiment::Mixed] {
        let n = b.get(s);
        if s == Sentiment::Mixed && n == 0 {
            continue;
        }
        md.push_str(&format!("- {}: {} ({:.0}%)\n", s.title(), n, percent(n, b.total())));
    }
    md.push('\n');

    if !h.common_aspects.is_empty() {
        md.push_str("## Common Aspects\n");
        for a in &h.common_aspects {
            md.push_str(&format!(
                "- **{}** {} · {} mentions ({} positive, {} negative)",
                a.aspect,
                a.average_sentiment.title(),
                a.count,
                a.positive_count,
                a.negative_count
            ));
            if let Some(avg) = a.average_star_rating {
                md.push_str(&format!(" · {:.1}★", avg));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    md.push_str(&format!("## Reviews ({})\n\n", h.reviews.len()));
    for r in &h.reviews {
        render_digest(&mut md, r, tz);
    }
    md
}

pub fn render_analysis(a: &Analysis) -> String {
    let mut out = format!(
        "Preview: {} {} (confidence {:.2})",
        sentiment_mark(a.sentiment),
        a.sentiment.title(),
        a.score
    );
    if let Some(s) = a.star_rating {
        out.push_str(&format!("  {} {}/5", stars(s), s));
    }
    out.push('\n');
    if a.aspects.is_empty() {
        out.push_str("  No aspects detected\n");
    } else {
        out.push_str(&format!("  {}\n", aspect_line(&a.aspects)));
    }
    out
}
