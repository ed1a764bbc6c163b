use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::json;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::models::{HospitalSummary, Review};
use crate::render::render_hospital_profile;
use crate::stats::community_insights;

/// Write the review list, hospital summaries and one Markdown profile per
/// hospital into `<out_dir>/<date>/`. Returns the date directory.
pub fn write_bundle(
    out_dir: &Path,
    date: &str, // "YYYY-MM-DD"
    reviews: &[Review],
    summaries: &[HospitalSummary],
    tz: &Tz,
) -> Result<PathBuf> {
    let date_dir = out_dir.join(date);
    let profiles_dir = date_dir.join("profiles");
    fs::create_dir_all(&profiles_dir).with_context(|| format!("create {:?}", profiles_dir))?;

    write_json(date_dir.join("reviews.json"), reviews)?;
    debug!("Wrote reviews.json");
    write_json(date_dir.join("hospitals.json"), summaries)?;
    debug!("Wrote hospitals.json");

    let mut used = HashSet::new();
    let mut profile_files = Vec::with_capacity(summaries.len());
    for h in summaries {
        let name = unique_slug(&h.hospital_name, &mut used);
        let rel = format!("profiles/{}.md", name);
        fs::write(date_dir.join(&rel), render_hospital_profile(h, tz))
            .with_context(|| format!("write {}", rel))?;
        profile_files.push(json!({ "hospital": h.hospital_name, "file": rel }));
    }
    debug!("Wrote {} profiles", profile_files.len());

    let counts = match community_insights(reviews) {
        Some(i) => json!({
            "reviews": i.total,
            "positive": i.positive,
            "negative": i.negative,
            "hospitals": summaries.len(),
        }),
        None => json!({ "reviews": 0, "positive": 0, "negative": 0, "hospitals": 0 }),
    };
    let idx = json!({
        "date": date,
        "version": 1,
        "counts": counts,
        "files": ["reviews.json", "hospitals.json"],
        "profiles": profile_files,
    });
    write_json(date_dir.join("index.json"), &idx)?;

    Ok(date_dir)
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))
}

/// Lowercase alphanumeric runs joined by '-'.
pub fn slug(name: &str) -> String {
    let s = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    if s.is_empty() {
        "hospital".to_string()
    } else {
        s
    }
}

// "St Luke" and "St. Luke" slug alike but are separate hospitals
fn unique_slug(name: &str, used: &mut HashSet<String>) -> String {
    let base = slug(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::stats::{aggregate, tests::review};

    #[test]
    fn test_slug() {
        assert_eq!(slug("St. Luke's Medical Center"), "st-luke-s-medical-center");
        assert_eq!(slug("  ---  "), "hospital");
    }

    #[test]
    fn test_unique_slug() {
        let mut used = HashSet::new();
        assert_eq!(unique_slug("St Luke", &mut used), "st-luke");
        assert_eq!(unique_slug("St. Luke", &mut used), "st-luke-2");
        assert_eq!(unique_slug("ST LUKE", &mut used), "st-luke-3");
    }

    #[test]
    fn test_write_bundle() {
        let d = tempfile::tempdir().unwrap();
        let reviews = vec![
            review(1, "Mercy", Sentiment::Positive, 0.9),
            review(2, "Alder", Sentiment::Negative, -0.2),
            review(3, "Mercy", Sentiment::Negative, -0.6),
        ];
        let stats = aggregate(&reviews);
        let dir = write_bundle(d.path(), "2025-10-19", &reviews, &stats, &Tz::UTC).unwrap();

        assert_eq!(dir, d.path().join("2025-10-19"));
        assert!(dir.join("reviews.json").exists());
        assert!(dir.join("profiles/mercy.md").exists());
        assert!(dir.join("profiles/alder.md").exists());

        let hospitals: Vec<HospitalSummary> =
            serde_json::from_slice(&fs::read(dir.join("hospitals.json")).unwrap()).unwrap();
        assert_eq!(hospitals, stats);

        let idx: serde_json::Value = serde_json::from_slice(&fs::read(dir.join("index.json")).unwrap()).unwrap();
        assert_eq!(idx["counts"]["reviews"], 3);
        assert_eq!(idx["counts"]["hospitals"], 2);
        assert_eq!(idx["profiles"][0]["file"], "profiles/mercy.md");
    }

    #[test]
    fn test_write_bundle_empty() {
        let d = tempfile::tempdir().unwrap();
        let dir = write_bundle(d.path(), "2025-10-19", &[], &[], &Tz::UTC).unwrap();
        let idx: serde_json::Value = serde_json::from_slice(&fs::read(dir.join("index.json")).unwrap()).unwrap();
        assert_eq!(idx["counts"]["reviews"], 0);
        assert_eq!(idx["profiles"].as_array().map(|a| a.len()), Some(0));
    }
}
