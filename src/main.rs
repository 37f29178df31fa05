mod db;
mod enrich;
mod error;
mod jsonl;
mod parser;
mod pipeline;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::jsonl::StoredStory;
use crate::parser::RawDocument;
use crate::pipeline::Enricher;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "story_harvest", about = "Horror story extraction, enrichment and storage")]
struct Cli {
    /// Settings file (default: ./story_harvest.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the stories table
    Init,
    /// Extract, enrich and store crawled pages (JSONL of {url, html, metadata?})
    Ingest {
        file: PathBuf,
        /// Max documents to read
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Re-enrich and store previously extracted stories (a JSONL export, or a
    /// directory of them)
    Import {
        path: PathBuf,
        /// Max stories to read across all files
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Where input files are copied before import (default: <output_dir>/backup)
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Print one stored story
    Show { url: String },
    /// Write stored stories as JSONL
    Export {
        /// Only stories with this primary genre
        #[arg(short, long)]
        genre: Option<String>,
        /// Output file (default: <output_dir>/stories_<timestamp>.jsonl)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stories overview table
    Stories {
        /// Filter by primary genre (e.g. "Supernatural")
        #[arg(short, long)]
        genre: Option<String>,
        /// Filter by trope (e.g. "Time Loop")
        #[arg(short, long)]
        trope: Option<String>,
        #[arg(long)]
        min_words: Option<usize>,
        #[arg(long)]
        max_words: Option<usize>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Totals plus genre and trope distributions
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    info!(settings_loaded = ?settings, msg = "Starting story_harvest");

    let conn = db::connect(&settings.database_path)
        .with_context(|| format!("Failed to open database {:?}", settings.database_path))?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Init => {
            println!("Schema ready at {}", settings.database_path.display());
            Ok(())
        }
        Commands::Ingest { file, limit } => {
            let enricher = Enricher::from_settings(&settings)?;
            let (docs, malformed) = jsonl::read_jsonl::<RawDocument>(&file, limit)?;
            if docs.is_empty() {
                println!("No documents in {} ({} malformed lines).", file.display(), malformed);
                return Ok(());
            }
            println!("Ingesting {} documents ({} malformed lines skipped)...", docs.len(), malformed);
            let stats = pipeline::run_batches(&conn, &docs, settings.batch_size, |d| {
                enricher.enrich_document(d)
            })?;
            stats.print();
            Ok(())
        }
        Commands::Import {
            path,
            limit,
            backup_dir,
        } => {
            let enricher = Enricher::from_settings(&settings)?;
            let files = jsonl::input_files(&path)?;
            let backup_dir = backup_dir.unwrap_or_else(|| settings.output_dir.join("backup"));

            let mut stories = Vec::new();
            let mut malformed = 0;
            for file in &files {
                let remaining = limit.map(|n| n.saturating_sub(stories.len()));
                if remaining == Some(0) {
                    break;
                }
                let saved = jsonl::backup(file, &backup_dir)?;
                info!(file = %file.display(), backup = %saved.display(), "Backed up input");
                let (batch, bad) = jsonl::read_jsonl::<StoredStory>(file, remaining)?;
                stories.extend(batch);
                malformed += bad;
            }
            if stories.is_empty() {
                println!("No stories in {} ({} malformed lines).", path.display(), malformed);
                return Ok(());
            }
            println!(
                "Importing {} stories from {} files ({} malformed lines skipped)...",
                stories.len(),
                files.len(),
                malformed
            );
            let stats = pipeline::run_batches(&conn, &stories, settings.batch_size, |s| {
                enricher.enrich_stored(s)
            })?;
            stats.print();
            Ok(())
        }
        Commands::Export { genre, output } => {
            let filter = db::StoryFilter {
                genre,
                ..Default::default()
            };
            let stories = db::fetch_stories(&conn, &filter)?;
            if stories.is_empty() {
                println!("No stories to export.");
                return Ok(());
            }
            let path = output
                .unwrap_or_else(|| jsonl::default_export_path(&settings.output_dir, chrono::Utc::now()));
            let written = jsonl::write_jsonl(&path, &stories)?;
            println!("Exported {} stories to {}", written, path.display());
            Ok(())
        }
        Commands::Show { url } => {
            let Some(story) = db::get_story(&conn, &url)? else {
                println!("No story stored for {}", url);
                return Ok(());
            };
            let date = story.publication_date.map(|d| d.to_string());
            println!("Title:      {}", story.title);
            println!("Author:     {}", story.author);
            println!("Published:  {}", date.as_deref().unwrap_or("-"));
            println!("Genre:      {}", story.genre_primary);
            println!("Secondary:  {}", story.genre_secondary.join(", "));
            println!("Tropes:     {}", story.tropes.join(", "));
            println!("Tags:       {}", story.tags.join(", "));
            println!(
                "Style:      {} words, {} sentences, readability {}",
                story.writing_style.word_count,
                story.writing_style.sentence_count,
                story.writing_style.readability_score
            );
            println!("Updated:    {}", story.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("\n{}", story.body);
            Ok(())
        }
        Commands::Stories {
            genre,
            trope,
            min_words,
            max_words,
            limit,
        } => {
            let filter = db::StoryFilter {
                genre,
                trope,
                min_words,
                max_words,
                limit: Some(limit),
            };
            let rows = db::fetch_overview(&conn, &filter)?;
            if rows.is_empty() {
                println!("No stories found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:<20} | {:<14} | {:>6} | {:<30}",
                "#", "Title", "Author", "Genre", "Words", "Tropes"
            );
            println!("{}", "-".repeat(120));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:<20} | {:<14} | {:>6} | {:<30}",
                    i + 1,
                    truncate(&r.title, 32),
                    truncate(&r.author, 20),
                    truncate(&r.genre_primary, 14),
                    r.word_count,
                    truncate(&r.tropes.join(", "), 30),
                );
            }

            println!("\n{} stories", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Stories:       {}", s.total);
            println!("Authors:       {}", s.known_authors);
            println!("Dated:         {}", s.dated);
            println!("Words:         {}", s.total_words);
            println!("Last updated:  {}", s.last_updated.as_deref().unwrap_or("-"));

            let genres = db::genre_distribution(&conn)?;
            if !genres.is_empty() {
                println!("\n--- Genres ---");
                for (genre, n) in &genres {
                    println!("  {:<20} {:>6}", genre, n);
                }
            }
            let tropes = db::trope_distribution(&conn)?;
            if !tropes.is_empty() {
                println!("\n--- Tropes ---");
                for (trope, n) in &tropes {
                    println!("  {:<24} {:>6}", trope, n);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
