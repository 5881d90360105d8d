//! Doctrans CLI - run the translate and edit workflows from the command line.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use doctrans_core::{config::Tier, AppConfig, EditSpec, FileType, Lang, TranslateRequest};

#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(author, version, about = "Translate and edit documents with versioned storage", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://doctrans.db?mode=rwc")]
    database_url: String,

    /// Passphrase for content encryption at rest
    #[arg(long, env = "DOCTRANS_ENCRYPTION_PASSPHRASE")]
    encryption_passphrase: String,

    /// Translation tier (free or premium)
    #[arg(long, env = "DOCTRANS_TIER", default_value = "free")]
    tier: String,

    /// LibreTranslate-compatible endpoint for the free tier
    #[arg(long, env = "DOCTRANS_FREE_API_BASE")]
    free_api_base: Option<String>,

    /// API key for the premium tier
    #[arg(long, env = "DOCTRANS_API_KEY")]
    api_key: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a document and store it with its first version
    Translate {
        /// Input file (pdf, jpg, jpeg, or png)
        input: PathBuf,

        /// Target language code
        #[arg(short = 't', long, default_value = "en")]
        target: String,

        /// Write the rebuilt artifact here as well as into storage
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Owner id recorded on the document
        #[arg(long, default_value = "cli")]
        owner: String,
    },
    /// Apply a JSON edit spec to a stored document
    Edit {
        /// Document id returned by a previous translate run
        document_id: String,

        /// Path to an EditSpec JSON file
        spec: PathBuf,

        /// Write the edited artifact here as well as into storage
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Owner id the document belongs to
        #[arg(long, default_value = "cli")]
        owner: String,
    },
}

fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load();
    config.storage.database_url = args.database_url.clone();
    config.storage.encryption_passphrase = args.encryption_passphrase.clone();
    config.translator.tier = match args.tier.as_str() {
        "free" => Tier::Free,
        "premium" => Tier::Premium,
        other => bail!("unknown tier {other:?}, expected \"free\" or \"premium\""),
    };
    if let Some(base) = &args.free_api_base {
        config.translator.free_api_base = base.clone();
    }
    if args.api_key.is_some() {
        config.translator.api_key = args.api_key.clone();
    }
    Ok(config)
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")?;

    let config = build_config(&args)?;
    let pipeline = doctrans_core::assemble_pipeline(&config)
        .await
        .context("failed to assemble pipeline")?;

    match args.command {
        Command::Translate {
            input,
            target,
            output,
            owner,
        } => {
            let filename = input
                .file_name()
                .and_then(|n| n.to_str())
                .context("input path has no filename")?
                .to_string();
            let file_type = FileType::from_filename(&filename)
                .context("unsupported file type; expected pdf, jpg, jpeg, or png")?;
            let data = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;

            let bar = spinner("translating document...");
            let outcome = pipeline
                .translate_document(TranslateRequest {
                    owner_id: owner,
                    filename,
                    bytes: Bytes::from(data),
                    file_type,
                    target_lang: Lang::new(target),
                })
                .await?;
            bar.finish_and_clear();

            if !outcome.translated {
                eprintln!("warning: translation backend unavailable, artifact carries the original text");
            }
            println!("document id: {}", outcome.document.id);
            println!("version id:  {}", outcome.version.id);
            println!("source lang: {}", outcome.source_lang);

            if let Some(path) = output {
                write_version(&pipeline, &outcome.version.id, &path).await?;
            }
        }
        Command::Edit {
            document_id,
            spec,
            output,
            owner,
        } => {
            let spec_json = std::fs::read_to_string(&spec)
                .with_context(|| format!("failed to read {}", spec.display()))?;
            let spec: EditSpec =
                serde_json::from_str(&spec_json).context("invalid edit spec JSON")?;

            let bar = spinner("applying edits...");
            let outcome = pipeline.edit_document(&owner, &document_id, spec).await?;
            bar.finish_and_clear();

            println!("version id: {}", outcome.version.id);
            for op in &outcome.applied {
                println!("applied: {op}");
            }
            for op in &outcome.skipped {
                println!("skipped: {op}");
            }

            if let Some(path) = output {
                write_version(&pipeline, &outcome.version.id, &path).await?;
            }
        }
    }

    Ok(())
}

/// Fetch a stored version (decrypted) and write it to disk.
async fn write_version(
    pipeline: &doctrans_core::DocumentPipeline,
    version_id: &str,
    path: &Path,
) -> Result<()> {
    let version = pipeline
        .storage()
        .get_version_by_id(version_id)
        .await?
        .context("stored version vanished")?;
    std::fs::write(path, &version.content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("artifact written to {}", path.display());
    Ok(())
}
