mod api_types;
mod config;
mod debounce;
mod draft;
mod export;
mod fetch;
mod models;
mod render;
mod stats;
mod view;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::draft::ReviewDraft;
use crate::fetch::ReviewApi;
use crate::models::{NewReview, Sentiment};
use crate::view::{ViewAction, ViewState};

/// HealthVoice - hospital reviews and sentiment from the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (overrides HEALTHVOICE_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and HEALTHVOICE_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List reviews, newest first, with filters and paging
    Reviews {
        /// Case-insensitive substring of the hospital name
        #[arg(short, long)]
        search: Option<String>,

        /// Exact hospital name
        #[arg(long)]
        hospital: Option<String>,

        /// positive | negative | neutral | mixed
        #[arg(long, value_parser = parse_sentiment)]
        sentiment: Option<Sentiment>,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// 10, 20 or 30 (default from config)
        #[arg(long, value_parser = parse_page_size)]
        per_page: Option<usize>,

        /// Do not truncate long reviews
        #[arg(long)]
        full: bool,
    },

    /// Per-hospital summary table, most reviewed first
    Hospitals {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Profile of one hospital: ratings, breakdown, common aspects, reviews
    Profile {
        name: String,
    },

    /// Submit a review for analysis and publication
    Submit {
        #[arg(long)]
        hospital: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long)]
        text: String,
    },

    /// Analyse text without storing it
    Analyze {
        text: String,
    },

    /// Type a review line by line with a live analysis preview
    Compose {
        #[arg(long)]
        hospital: Option<String>,

        #[arg(long, default_value = "")]
        address: String,

        /// Submit the draft at end of input
        #[arg(long)]
        submit: bool,
    },

    /// Submit every review in a JSON file ([{hospital_name, hospital_address, review_text}])
    Import {
        file: PathBuf,
    },

    /// Write reviews, hospital summaries and profiles into <output-dir>/<date>/
    Export {
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
    },
}

fn parse_sentiment(s: &str) -> std::result::Result<Sentiment, String> {
    Sentiment::from_label(s).ok_or_else(|| format!("unknown sentiment {:?}", s))
}

fn parse_page_size(s: &str) -> std::result::Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("not a number: {:?}", s))?;
    if !view::PAGE_SIZES.contains(&n) {
        return Err(format!("page size must be one of {:?}", view::PAGE_SIZES));
    }
    Ok(n)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = config::resolve(args.config.as_deref(), args.api_base.as_deref())?;
    cfg.validate()?;
    debug!("Config resolved - api_base={}, tz={}", cfg.api_base, cfg.display_timezone);

    let api = ReviewApi::new(&cfg.api_base, cfg.timeout())?;

    match args.command {
        Command::Reviews { search, hospital, sentiment, page, per_page, full } => {
            run_reviews(&api, &cfg, search, hospital, sentiment, page, per_page, full).await
        }
        Command::Hospitals { json } => run_hospitals(&api, json).await,
        Command::Profile { name } => run_profile(&api, &cfg, &name).await,
        Command::Submit { hospital, address, text } => {
            let draft = ReviewDraft {
                hospital_name: hospital,
                hospital_address: address,
                review_text: text,
            };
            run_submit(&api, &cfg, &draft).await
        }
        Command::Analyze { text } => {
            let analysis = api.analyze_text(&text).await?;
            print!("{}", render::render_analysis(&analysis));
            Ok(())
        }
        Command::Compose { hospital, address, submit } => {
            run_compose(Arc::new(api), &cfg, hospital, address, submit).await
        }
        Command::Import { file } => run_import(&api, &cfg, &file).await,
        Command::Export { output_dir } => run_export(&api, &cfg, &output_dir).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_reviews(
    api: &ReviewApi,
    cfg: &Config,
    search: Option<String>,
    hospital: Option<String>,
    sentiment: Option<Sentiment>,
    page: usize,
    per_page: Option<usize>,
    full: bool,
) -> Result<()> {
    let reviews = api.fetch_reviews().await?;
    let tz = cfg.timezone()?;

    let mut state = ViewState::new(cfg.page_size);
    let mut actions = Vec::new();
    if let Some(n) = per_page {
        actions.push(ViewAction::SetPageSize(n));
    }
    if let Some(q) = search {
        actions.push(ViewAction::SetSearch(q));
    }
    if hospital.is_some() {
        actions.push(ViewAction::SelectHospital(hospital));
    }
    if sentiment.is_some() {
        actions.push(ViewAction::SelectSentiment(sentiment));
    }
    for a in actions {
        let len = state.filter(&reviews).len();
        state.apply(a, len);
    }
    let filtered = state.filter(&reviews);
    state.apply(ViewAction::SetPage(page), filtered.len());

    if reviews.is_empty() {
        println!("No reviews yet. Be the first: healthvoice submit --hospital <NAME> --text <REVIEW>");
        return Ok(());
    }
    if let Some(i) = stats::community_insights(&reviews) {
        println!("{}", render::render_insights(&i));
    }
    let pv = state.paginate(&filtered);
    print!("{}", render::render_review_page(&pv, &state, &tz, full));
    Ok(())
}

async fn run_hospitals(api: &ReviewApi, json: bool) -> Result<()> {
    let reviews = api.fetch_reviews().await?;
    let summaries = stats::aggregate(&reviews);
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", render::render_hospital_table(&summaries));
    }
    Ok(())
}

async fn run_profile(api: &ReviewApi, cfg: &Config, name: &str) -> Result<()> {
    let reviews = api.fetch_reviews().await?;
    let summaries = stats::aggregate(&reviews);
    let Some(h) = stats::find_hospital(&summaries, name) else {
        let names = stats::hospital_names(&reviews);
        bail!("No reviews for hospital {:?}. Known hospitals: {}", name, names.join(", "));
    };
    print!("{}", render::render_hospital_profile(h, &cfg.timezone()?));
    Ok(())
}

async fn run_submit(api: &ReviewApi, cfg: &Config, draft: &ReviewDraft) -> Result<()> {
    let req = draft.validate()?;
    let review = api
        .create_review(&req)
        .await
        .context("Failed to submit review, please try again later")?;
    println!("Review submitted successfully! Your review has been analyzed and published.\n");
    print!("{}", render::render_review_card(&review, &cfg.timezone()?, true));
    Ok(())
}

async fn run_compose(
    api: Arc<ReviewApi>,
    cfg: &Config,
    hospital: Option<String>,
    address: String,
    submit: bool,
) -> Result<()> {
    let mut draft = ReviewDraft {
        hospital_address: address,
        ..Default::default()
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match hospital {
        Some(h) => draft.hospital_name = h,
        None => {
            // offer the hospitals already reviewed, like the form's picker
            let reviews = api.fetch_reviews().await?;
            let known = stats::existing_hospitals(&reviews);
            if !known.is_empty() {
                eprintln!("Existing hospitals:");
                for (i, h) in known.iter().enumerate() {
                    eprintln!("  {}. {} {}", i + 1, h.name, h.address);
                }
                eprintln!("First line: a number to pick one, or a new hospital name.");
            }
            let first = lines.next_line().await?.unwrap_or_default();
            let first = first.trim();
            match first.parse::<usize>().ok().and_then(|n| known.get(n.wrapping_sub(1))) {
                Some(h) => draft.pick_hospital(h),
                None => draft.hospital_name = first.to_string(),
            }
        }
    }

    eprintln!("Type your review; a preview appears after a pause. End with Ctrl-D.");
    let (mut debouncer, mut previews) = Debouncer::new(cfg.debounce());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(l) => {
                        if !draft.review_text.is_empty() {
                            draft.review_text.push('\n');
                        }
                        draft.review_text.push_str(&l);
                        if draft.preview_needed() {
                            let api = Arc::clone(&api);
                            let text = draft.review_text.clone();
                            debouncer.schedule(async move { api.analyze_text(&text).await });
                        } else {
                            debouncer.cancel();
                        }
                    }
                    None => break,
                }
            }
            Some(preview) = previews.recv() => match preview {
                Ok(a) => eprint!("{}", render::render_analysis(&a)),
                Err(e) => warn!("Preview unavailable - reason={:#}", e),
            },
        }
    }
    debouncer.cancel();

    if submit {
        run_submit(&api, cfg, &draft).await
    } else {
        match draft.validate() {
            Ok(req) => println!("{}", serde_json::to_string_pretty(&req)?),
            Err(e) => eprintln!("Draft incomplete: {}", e),
        }
        Ok(())
    }
}

async fn run_import(api: &ReviewApi, cfg: &Config, file: &PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Reading {}", file.display()))?;
    let entries: Vec<NewReview> =
        serde_json::from_str(&text).with_context(|| format!("Decoding JSON in {}", file.display()))?;

    let mut valid = Vec::with_capacity(entries.len());
    for (i, e) in entries.into_iter().enumerate() {
        let draft = ReviewDraft {
            hospital_name: e.hospital_name,
            hospital_address: e.hospital_address,
            review_text: e.review_text,
        };
        match draft.validate() {
            Ok(req) => valid.push(req),
            Err(err) => warn!("Skipping entry - index={}, reason={}", i, err),
        }
    }
    info!("Import starting - entries={}, batch_size={}", valid.len(), cfg.batch_size);

    let results = api.create_reviews(&valid, cfg.batch_size).await;
    let mut failed = 0usize;
    for (req, res) in valid.iter().zip(&results) {
        match res {
            Ok(r) => println!("{}\t{}\t{}", r.id, r.hospital_name, r.overall_sentiment),
            Err(e) => {
                failed += 1;
                error!("Import failed - hospital={}, reason={:#}", req.hospital_name, e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} reviews failed to import", failed, results.len());
    }
    Ok(())
}

async fn run_export(api: &ReviewApi, cfg: &Config, output_dir: &PathBuf) -> Result<()> {
    let start = std::time::Instant::now();
    let tz = cfg.timezone()?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let reviews = api.fetch_reviews().await?;
    let summaries = stats::aggregate(&reviews);
    let dir = export::write_bundle(output_dir, &today.format("%Y-%m-%d").to_string(), &reviews, &summaries, &tz)?;

    info!(
        "Export completed - duration={:.2}s, reviews={}, hospitals={}, directory={}",
        start.elapsed().as_secs_f32(),
        reviews.len(),
        summaries.len(),
        dir.display()
    );
    Ok(())
}
