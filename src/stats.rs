use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::models::{
    AspectSummary, CommunityInsights, HospitalSummary, KnownHospital, Review, ReviewDigest,
    Sentiment, SentimentBreakdown,
};

pub const MAX_COMMON_ASPECTS: usize = 5;

#[derive(Default)]
struct AspectTally {
    count: usize,
    positive: usize,
    negative: usize,
    star_sum: u32,
    star_n: u32,
}

/// Group reviews by hospital name and summarise each group.
///
/// Groups keep first-seen order before the final stable sort on review count,
/// so equally reviewed hospitals stay in input order.
pub fn aggregate(reviews: &[Review]) -> Vec<HospitalSummary> {
    let mut order: Vec<(&str, Vec<&Review>)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for r in reviews {
        let name = r.hospital_name.as_str();
        let idx = *slot.entry(name).or_insert_with(|| {
            order.push((name, Vec::new()));
            order.len() - 1
        });
        order[idx].1.push(r);
    }

    let mut out: Vec<HospitalSummary> = order
        .into_iter()
        .map(|(name, group)| summarize_hospital(name, &group))
        .collect();
    out.sort_by(|a, b| b.total_reviews.cmp(&a.total_reviews));

    debug!("Aggregated hospitals - reviews={}, hospitals={}", reviews.len(), out.len());
    out
}

fn summarize_hospital(name: &str, group: &[&Review]) -> HospitalSummary {
    let first = group[0];
    let n = group.len() as f64;

    let mut breakdown = SentimentBreakdown::default();
    let mut score_sum = 0.0;
    let mut stars_sum = 0.0;
    for r in group {
        breakdown.record(r.overall_sentiment);
        score_sum += r.sentiment_score;
        stars_sum += r.overall_sentiment.derived_stars();
    }

    let mut reviews: Vec<ReviewDigest> = group.iter().map(|r| ReviewDigest::from(*r)).collect();
    reviews.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    HospitalSummary {
        hospital_id: first.hospital_id.clone(),
        hospital_name: name.to_string(),
        hospital_address: first.hospital_address.clone().unwrap_or_default(),
        total_reviews: group.len(),
        average_score: score_sum / n,
        average_star_rating: stars_sum / n,
        sentiment_breakdown: breakdown,
        common_aspects: common_aspects(group),
        reviews,
    }
}

fn common_aspects(group: &[&Review]) -> Vec<AspectSummary> {
    let mut order: Vec<(&str, AspectTally)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for a in group.iter().flat_map(|r| r.aspects.iter()) {
        let label = a.aspect.as_str();
        let idx = *slot.entry(label).or_insert_with(|| {
            order.push((label, AspectTally::default()));
            order.len() - 1
        });
        let t = &mut order[idx].1;
        t.count += 1;
        // anything short of positive counts against the aspect
        if a.sentiment == Sentiment::Positive {
            t.positive += 1;
        } else {
            t.negative += 1;
        }
        if let Some(s) = a.star_rating {
            t.star_sum += u32::from(s);
            t.star_n += 1;
        }
    }

    let mut out: Vec<AspectSummary> = order
        .into_iter()
        .map(|(label, t)| AspectSummary {
            aspect: label.to_string(),
            count: t.count,
            average_sentiment: if t.positive >= t.negative {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            },
            positive_count: t.positive,
            negative_count: t.negative,
            total_mentions: t.positive + t.negative,
            average_star_rating: (t.star_n > 0).then(|| f64::from(t.star_sum) / f64::from(t.star_n)),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(MAX_COMMON_ASPECTS);
    out
}

pub fn community_insights(reviews: &[Review]) -> Option<CommunityInsights> {
    if reviews.is_empty() {
        return None;
    }
    let count = |s: Sentiment| reviews.iter().filter(|r| r.overall_sentiment == s).count();
    Some(CommunityInsights {
        total: reviews.len(),
        positive: count(Sentiment::Positive),
        negative: count(Sentiment::Negative),
    })
}

/// Distinct hospital names, sorted.
pub fn hospital_names(reviews: &[Review]) -> Vec<String> {
    reviews
        .iter()
        .map(|r| r.hospital_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct hospitals in first-seen order, each with the first address seen for it.
pub fn existing_hospitals(reviews: &[Review]) -> Vec<KnownHospital> {
    let mut seen = std::collections::HashSet::new();
    reviews
        .iter()
        .filter(|r| seen.insert(r.hospital_name.as_str()))
        .map(|r| KnownHospital {
            name: r.hospital_name.clone(),
            address: r.hospital_address.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn find_hospital<'a>(summaries: &'a [HospitalSummary], name: &str) -> Option<&'a HospitalSummary> {
    summaries.iter().find(|h| h.hospital_name == name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Aspect;
    use chrono::{Duration, TimeZone, Utc};

    pub(crate) fn review(id: u32, hospital: &str, sentiment: Sentiment, score: f64) -> Review {
        Review {
            id: id.to_string(),
            hospital_id: format!("H{:03}", id),
            hospital_name: hospital.to_string(),
            hospital_address: None,
            review_text: format!("review {}", id),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i64::from(id)),
            overall_sentiment: sentiment,
            sentiment_score: score,
            star_rating: None,
            aspects: vec![],
        }
    }

    fn aspect(label: &str, sentiment: Sentiment, stars: Option<u8>) -> Aspect {
        Aspect {
            aspect: label.to_string(),
            sentiment,
            star_rating: stars,
            score: None,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
        assert!(community_insights(&[]).is_none());
    }

    #[test]
    fn test_average_score_and_counts() {
        let reviews = vec![
            review(1, "Hospital A", Sentiment::Positive, 0.8),
            review(2, "Hospital A", Sentiment::Negative, -0.4),
            review(3, "Hospital B", Sentiment::Positive, 0.5),
        ];
        let stats = aggregate(&reviews);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].hospital_name, "Hospital A");
        assert_eq!(stats[0].total_reviews, 2);
        assert!((stats[0].average_score - 0.2).abs() < 1e-9);
        assert_eq!(stats[1].hospital_name, "Hospital B");
        assert!((stats[1].average_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_summary_per_distinct_name() {
        let reviews = vec![
            review(1, "A", Sentiment::Positive, 0.1),
            review(2, "a", Sentiment::Positive, 0.1),
            review(3, "A ", Sentiment::Positive, 0.1),
            review(4, "A", Sentiment::Neutral, 0.1),
        ];
        let stats = aggregate(&reviews);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].hospital_name, "A");
        assert_eq!(stats[0].hospital_id, "H001");
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let reviews = vec![
            review(1, "A", Sentiment::Positive, 0.9),
            review(2, "A", Sentiment::Negative, -0.9),
            review(3, "A", Sentiment::Neutral, 0.0),
            review(4, "A", Sentiment::Mixed, 0.1),
        ];
        let stats = aggregate(&reviews);
        let b = stats[0].sentiment_breakdown;
        assert_eq!(b.total(), stats[0].total_reviews);
        assert_eq!((b.positive, b.negative, b.neutral, b.mixed), (1, 1, 1, 1));
    }

    #[test]
    fn test_derived_star_rating() {
        let mut r1 = review(1, "A", Sentiment::Positive, 0.9);
        r1.star_rating = Some(2);
        let reviews = vec![r1, review(2, "A", Sentiment::Negative, -0.9), review(3, "A", Sentiment::Neutral, 0.0)];
        let stats = aggregate(&reviews);
        // (5 + 1 + 3) / 3, explicit star_rating is ignored
        assert!((stats[0].average_star_rating - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_by_review_count_then_first_seen() {
        let reviews = vec![
            review(1, "C", Sentiment::Positive, 0.1),
            review(2, "B", Sentiment::Positive, 0.1),
            review(3, "B", Sentiment::Positive, 0.1),
            review(4, "D", Sentiment::Positive, 0.1),
        ];
        let names: Vec<_> = aggregate(&reviews).into_iter().map(|h| h.hospital_name).collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_aspect_majority() {
        let mut r1 = review(1, "A", Sentiment::Positive, 0.5);
        r1.aspects = vec![aspect("staff", Sentiment::Positive, Some(5))];
        let mut r2 = review(2, "A", Sentiment::Positive, 0.5);
        r2.aspects = vec![aspect("staff", Sentiment::Positive, Some(4))];
        let mut r3 = review(3, "A", Sentiment::Negative, -0.5);
        r3.aspects = vec![aspect("staff", Sentiment::Negative, None)];

        let stats = aggregate(&[r1, r2, r3]);
        let staff = &stats[0].common_aspects[0];
        assert_eq!(staff.aspect, "staff");
        assert_eq!(staff.count, 3);
        assert_eq!(staff.positive_count, 2);
        assert_eq!(staff.negative_count, 1);
        assert_eq!(staff.total_mentions, 3);
        assert_eq!(staff.average_sentiment, Sentiment::Positive);
        assert_eq!(staff.average_star_rating, Some(4.5));
    }

    #[test]
    fn test_aspect_tie_favors_positive() {
        let mut r = review(1, "A", Sentiment::Mixed, 0.0);
        r.aspects = vec![
            aspect("wait_time", Sentiment::Negative, None),
            aspect("wait_time", Sentiment::Positive, None),
            aspect("billing", Sentiment::Negative, None),
            aspect("billing", Sentiment::Neutral, None),
        ];
        let stats = aggregate(&[r]);
        let aspects = &stats[0].common_aspects;
        assert_eq!(aspects[0].average_sentiment, Sentiment::Positive);
        assert_eq!(aspects[1].aspect, "billing");
        assert_eq!(aspects[1].count, 2);
        assert_eq!(aspects[1].negative_count, 2);
        assert_eq!(aspects[1].total_mentions, 2);
        assert_eq!(aspects[1].average_sentiment, Sentiment::Negative);
        assert_eq!(aspects[1].average_star_rating, None);
    }

    #[test]
    fn test_neutral_aspects_count_as_negative() {
        let mut r = review(1, "A", Sentiment::Neutral, 0.0);
        r.aspects = vec![
            aspect("billing", Sentiment::Neutral, None),
            aspect("billing", Sentiment::Mixed, Some(3)),
            aspect("staff", Sentiment::Positive, None),
        ];
        let stats = aggregate(&[r]);
        let billing = &stats[0].common_aspects[0];
        assert_eq!((billing.count, billing.positive_count, billing.negative_count), (2, 0, 2));
        assert_eq!(billing.average_sentiment, Sentiment::Negative);
        assert!(stats[0].common_aspects.iter().all(|a| a.total_mentions == a.count));
    }

    #[test]
    fn test_common_aspects_capped_at_five() {
        let mut r = review(1, "A", Sentiment::Positive, 0.5);
        r.aspects = ["a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .map(|l| aspect(l, Sentiment::Positive, None))
            .collect();
        r.aspects.push(aspect("g", Sentiment::Positive, None));
        let stats = aggregate(&[r]);
        let labels: Vec<_> = stats[0].common_aspects.iter().map(|a| a.aspect.as_str()).collect();
        assert_eq!(labels, vec!["g", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_reviews_newest_first() {
        let reviews = vec![
            review(2, "A", Sentiment::Positive, 0.1),
            review(5, "A", Sentiment::Positive, 0.1),
            review(1, "A", Sentiment::Positive, 0.1),
        ];
        let stats = aggregate(&reviews);
        let ids: Vec<_> = stats[0].reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "2", "1"]);
        assert!(stats[0].reviews.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test]
    fn test_address_defaults_to_empty() {
        let mut r2 = review(2, "A", Sentiment::Positive, 0.1);
        r2.hospital_address = Some("1 Main St".into());
        let stats = aggregate(&[review(1, "A", Sentiment::Positive, 0.1), r2]);
        assert_eq!(stats[0].hospital_address, "");
    }

    #[test]
    fn test_list_helpers() {
        let mut r1 = review(1, "Mercy", Sentiment::Positive, 0.1);
        r1.hospital_address = Some("9 Elm".into());
        let reviews = vec![
            r1,
            review(2, "Alder", Sentiment::Negative, -0.3),
            review(3, "Mercy", Sentiment::Neutral, 0.0),
        ];
        assert_eq!(hospital_names(&reviews), vec!["Alder", "Mercy"]);
        let known = existing_hospitals(&reviews);
        assert_eq!(known.len(), 2);
        assert_eq!(known[0], KnownHospital { name: "Mercy".into(), address: "9 Elm".into() });
        assert_eq!(known[1].address, "");

        let insights = community_insights(&reviews).unwrap();
        assert_eq!((insights.total, insights.positive, insights.negative), (3, 1, 1));

        let stats = aggregate(&reviews);
        assert_eq!(find_hospital(&stats, "Alder").map(|h| h.total_reviews), Some(1));
        assert!(find_hospital(&stats, "Nowhere").is_none());
    }
}
