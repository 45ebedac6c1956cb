// vidpeek CLI binary

use std::path::{Path, PathBuf};
use clap::{Args, Parser, Subcommand};
use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;

use vidpeek_lib::constants::DB_FILENAME;
use vidpeek_lib::db::open_db_read_only;
use vidpeek_lib::db::schema::{self, VideoFilter, VideoRecord};
use vidpeek_lib::ingest::discover::{discover_videos, read_links_file};
use vidpeek_lib::ingest::{BatchReport, ItemResult};
use vidpeek_lib::tools::{missing_tools, Tool};
use vidpeek_lib::{Coordinator, PipelineConfig, PreviewFormat, SourceKind};

const DATA_DIR_NAME: &str = "vidpeek";

#[derive(Parser)]
#[command(name = "vidpeek")]
#[command(about = "vidpeek - ingest videos and generate short previews", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Output directory (defaults to the user data dir)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON pipeline config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct IngestArgs {
    /// Owner of the ingested videos
    #[arg(short, long)]
    user: String,
    #[command(flatten)]
    store: StoreArgs,
    /// Re-render and replace videos already stored
    #[arg(long)]
    force: bool,
    /// Preview format (mp4 or gif)
    #[arg(long)]
    format: Option<PreviewFormat>,
    /// Preview length in seconds
    #[arg(long)]
    preview_seconds: Option<f64>,
    /// Preview width in pixels
    #[arg(long)]
    width: Option<u32>,
    /// Write the batch report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one or more urls or local files
    Ingest {
        /// Urls, file:// references or paths
        #[arg(required = true)]
        references: Vec<String>,
        #[command(flatten)]
        args: IngestArgs,
    },

    /// Ingest every reference listed in a links file
    IngestFile {
        /// One reference per line
        links: PathBuf,
        #[command(flatten)]
        args: IngestArgs,
    },

    /// Ingest every video found under a directory
    IngestDir {
        dir: PathBuf,
        #[command(flatten)]
        args: IngestArgs,
    },

    /// List stored videos
    List {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// remote or local
        #[arg(long)]
        source: Option<SourceKind>,
        #[arg(long, default_value = "100")]
        limit: i64,
        /// Export the listed records to a JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show video details
    Show {
        /// Record ID
        id: i64,
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Ingest { references, args } => cmd_ingest(references, args),
        Commands::IngestFile { links, args } => {
            let references = read_links_file(&links)?;
            println!("Read {} links from {}", references.len(), links.display());
            cmd_ingest(references, args)
        }
        Commands::IngestDir { dir, args } => {
            let references: Vec<String> = discover_videos(&dir)?
                .into_iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect();
            println!("Found {} videos under {}", references.len(), dir.display());
            cmd_ingest(references, args)
        }
        Commands::List { store, user, year, source, limit, json } => {
            let filter = VideoFilter { user, upload_year: year, source, limit: Some(limit) };
            cmd_list(store, filter, json)
        }
        Commands::Show { id, store } => cmd_show(id, store),
    }
}

fn init_logger(verbose: bool) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }
    Builder::new()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module("vidpeek_lib", if verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();
}

fn cmd_ingest(references: Vec<String>, args: IngestArgs) -> Result<()> {
    let config = build_config(&args)?;
    if references.is_empty() {
        println!("Nothing to ingest.");
        return Ok(());
    }
    check_tools()?;

    println!("Ingesting {} references into {}", references.len(), config.output_dir.display());
    let mut coordinator = Coordinator::new(config)?;
    let report = coordinator.process_batch(&references, &args.user);

    print_report(&report);

    if let Some(path) = args.report {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }

    if let Some(reason) = report.aborted {
        anyhow::bail!("Batch aborted: {}", reason);
    }
    Ok(())
}

fn cmd_list(store: StoreArgs, filter: VideoFilter, json: Option<PathBuf>) -> Result<()> {
    let config = load_config(&store)?;
    let conn = open_existing(&config)?;

    let videos = schema::list_videos(&conn, &filter)?;
    let total = schema::count_videos(&conn)?;

    if let Some(path) = json {
        std::fs::write(&path, serde_json::to_string_pretty(&videos)?)?;
        println!("Exported {} records to {}", videos.len(), path.display());
        return Ok(());
    }

    println!("Store: {} ({} videos total)", config.output_dir.display(), total);
    println!();

    if videos.is_empty() {
        println!("No videos found. Use 'vidpeek ingest <url>' to add some.");
        return Ok(());
    }

    println!("{:>5}  {:>10}  {:>6}  {:>6}  {}", "ID", "User", "Source", "Year", "Title");
    println!("{}", "-".repeat(70));

    for video in &videos {
        let year = video.upload_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        let title = video.title.as_deref().unwrap_or("-");

        println!("{:>5}  {:>10}  {:>6}  {:>6}  {}",
            video.id,
            truncate(&video.user, 10),
            video.source.as_deref().unwrap_or("-"),
            year,
            truncate(title, 40)
        );
    }

    if (videos.len() as i64) < total {
        println!();
        println!("Showing {} of {} videos. Use --limit or filters to narrow.", videos.len(), total);
    }

    Ok(())
}

fn cmd_show(id: i64, store: StoreArgs) -> Result<()> {
    let config = load_config(&store)?;
    let conn = open_existing(&config)?;

    let video = schema::get_video(&conn, id)?
        .ok_or_else(|| anyhow::anyhow!("Video {} not found", id))?;

    print_video(&video, &config.output_dir);
    Ok(())
}

// --- Helper Functions ---

/// Fail before the batch when ffmpeg or ffprobe cannot run, instead of once per item.
fn check_tools() -> Result<()> {
    let missing = missing_tools(&Tool::REQUIRED);
    if !missing.is_empty() {
        let hints: Vec<String> = missing
            .iter()
            .map(|t| format!("{} (or set {})", t, t.env_key()))
            .collect();
        anyhow::bail!("Required tools not found: {}", hints.join(", "));
    }
    if !Tool::YtDlp.is_available() {
        log::warn!("yt-dlp not found, remote references will fail to download");
    }
    Ok(())
}

fn default_output_dir() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.data_dir().join(DATA_DIR_NAME),
        None => PathBuf::from(".").join(DATA_DIR_NAME),
    }
}

/// Config file first, then the output directory flag.
fn load_config(store: &StoreArgs) -> Result<PipelineConfig> {
    let mut config = match &store.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::with_output_dir(default_output_dir()),
    };
    if let Some(ref output) = store.output {
        config.output_dir = output.clone();
    }
    Ok(config)
}

fn build_config(args: &IngestArgs) -> Result<PipelineConfig> {
    let mut config = load_config(&args.store)?;
    if args.force {
        config.force_reprocess = true;
    }
    if let Some(format) = args.format {
        config.preview_format = format;
    }
    if let Some(seconds) = args.preview_seconds {
        config.preview_seconds = seconds;
    }
    if let Some(width) = args.width {
        config.target_width = width;
    }
    config.validate()?;
    Ok(config)
}

fn open_existing(config: &PipelineConfig) -> Result<rusqlite::Connection> {
    let db_path = config.db_path();
    if !db_path.exists() {
        anyhow::bail!(
            "No {} found in {}. Use 'vidpeek ingest' to create one.",
            DB_FILENAME,
            config.output_dir.display()
        );
    }
    Ok(open_db_read_only(&db_path)?)
}

fn print_report(report: &BatchReport) {
    for item in &report.items {
        match &item.result {
            ItemResult::Ingested { id, .. } => println!("  [ok]   #{} {}", id, item.reference),
            ItemResult::Duplicate { existing_url, reason } => {
                println!("  [dup]  {} (same {} as {})", item.reference, reason.as_str(), existing_url)
            }
            ItemResult::Failed { stage, error } => {
                println!("  [fail] {} at {}: {}", item.reference, stage, error)
            }
        }
    }

    println!();
    println!("Ingest complete:");
    println!("  Ingested:     {}", report.ingested());
    println!("  Duplicates:   {}", report.duplicates());
    println!("  Failed:       {}", report.failed());
    if !report.not_attempted.is_empty() {
        println!("  Not attempted: {}", report.not_attempted.len());
    }
}

fn print_video(video: &VideoRecord, output_dir: &Path) {
    println!("Video #{}", video.id);
    println!();
    println!("Title:       {}", video.title.as_deref().unwrap_or("-"));
    println!("User:        {}", video.user);
    println!("Url:         {}", video.url);
    println!("Source:      {}", video.source.as_deref().unwrap_or("-"));

    if let Some(year) = video.upload_year {
        println!("Year:        {}", year);
    }
    if let Some(ref added) = video.date_added {
        println!("Added:       {}", added);
    }
    if let Some(ref hash) = video.content_hash {
        println!("Hash:        {}...", &hash[..hash.len().min(40)]);
    }

    println!();
    println!("Artifacts:");
    for (label, rel) in [("Thumbnail", &video.thumb_path), ("Preview", &video.vid_preview_path)] {
        match rel {
            Some(rel) => {
                let present = if output_dir.join(rel).is_file() { "" } else { " (missing)" };
                println!("  {:<10} {}{}", format!("{}:", label), rel, present);
            }
            None => println!("  {:<10} -", format!("{}:", label)),
        }
    }
    if let Some(ref kind) = video.preview_type {
        println!("  Format:    {}", kind);
    }

    if let Some(ref description) = video.description {
        if !description.is_empty() {
            println!();
            println!("{}", description);
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
