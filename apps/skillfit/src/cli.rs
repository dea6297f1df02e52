use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use crate::collector::{self, mail::GmailClient};
use crate::config::Config;
use crate::interview::{self, DEFAULT_QUESTION_COUNT};
use crate::llm_client::LlmClient;
use crate::matching;
use crate::models::offer::{ExtractedOffer, NewOffer};
use crate::offers::{self, extractor, repository::OfferRepository};

const DEFAULT_MAX_EMAILS: u32 = 50;
const DEFAULT_TOP_N: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "skillfit",
    about = "Collect CVs from the mailbox, extract job offers and shortlist candidates",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the mailbox for applications to one job and store the extracted CVs
    Ingest(IngestArgs),
    /// Extract one offer PDF into JSON
    ExtractOffer(ExtractOfferArgs),
    /// Download offer PDFs from announcement emails and extract them
    FetchOffers(FetchOffersArgs),
    /// Judge candidates against an offer and export the shortlist
    Match(MatchArgs),
    /// Build interview sheets for the retained candidates
    Interview(InterviewArgs),
    /// Manage stored offers
    Offers {
        #[command(subcommand)]
        command: OffersCommand,
    },
    /// Start the HTTP service
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Job title the applications must mention in their subject
    #[arg(long)]
    job: String,
    #[arg(long, default_value_t = DEFAULT_MAX_EMAILS)]
    max_emails: u32,
}

#[derive(Args, Debug)]
struct ExtractOfferArgs {
    pdf: PathBuf,
    /// Output directory, defaults to `<data>/offers/extracted`
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also store the offer in the database
    #[arg(long)]
    persist: bool,
}

#[derive(Args, Debug)]
struct FetchOffersArgs {
    #[arg(long, default_value_t = DEFAULT_MAX_EMAILS)]
    max_emails: u32,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Extracted offer JSON
    #[arg(long)]
    offer: PathBuf,
    /// Candidate store JSON
    #[arg(long)]
    candidates: PathBuf,
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InterviewArgs {
    /// `candidates_retained.json` from a matching run
    #[arg(long)]
    retained: PathBuf,
    /// One or more candidate store files
    #[arg(long, required = true, num_args = 1..)]
    candidates: Vec<PathBuf>,
    #[arg(long)]
    offer: PathBuf,
    #[arg(long, default_value_t = DEFAULT_QUESTION_COUNT)]
    questions: usize,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum OffersCommand {
    /// List stored offers, newest first
    List,
    Get { id: i64 },
    Delete { id: i64 },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn extraction_client(config: &Config) -> Result<LlmClient> {
    Ok(LlmClient::new(&config.llm)?.with_model(&config.llm.extraction_model))
}

pub(crate) async fn run(config: Config) -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => {
            let mail = GmailClient::new(&config.gmail)?;
            let llm = extraction_client(&config)?;
            let summary = collector::ingest_candidates(
                &mail,
                &llm,
                &args.job,
                args.max_emails,
                &config.data_dir,
            )
            .await?;
            print_json(&summary)
        }
        Command::ExtractOffer(args) => extract_offer(&config, args).await,
        Command::FetchOffers(args) => {
            let mail = GmailClient::new(&config.gmail)?;
            let llm = extraction_client(&config)?;
            let out_dir = args
                .out
                .unwrap_or_else(|| offers::default_out_dir(&config.data_dir));
            let summary =
                offers::fetch_offers(&mail, &llm, args.max_emails, &config.data_dir, &out_dir)
                    .await?;
            print_json(&summary)
        }
        Command::Match(args) => {
            let llm = LlmClient::new(&config.llm)?;
            let out_dir = args
                .out
                .unwrap_or_else(|| matching::default_out_dir(&config.data_dir));
            let summary =
                matching::run_matching(&llm, &args.offer, &args.candidates, args.top_n, &out_dir)
                    .await?;
            print_json(&summary)
        }
        Command::Interview(args) => {
            let out_dir = args
                .out
                .unwrap_or_else(|| interview::default_out_dir(&config.data_dir));
            let summary = interview::run_interview(
                &args.retained,
                &args.candidates,
                &args.offer,
                args.questions,
                &out_dir,
            )?;
            print_json(&summary)
        }
        Command::Offers { command } => {
            let repo = OfferRepository::open(&config.database_url).await?;
            match command {
                OffersCommand::List => print_json(&repo.list().await?),
                OffersCommand::Get { id } => match repo.get(id).await? {
                    Some(offer) => print_json(&offer),
                    None => bail!("offer {id} not found"),
                },
                OffersCommand::Delete { id } => {
                    if !repo.delete(id).await? {
                        bail!("offer {id} not found");
                    }
                    info!(id, "offer deleted");
                    Ok(())
                }
            }
        }
        Command::Serve(args) => crate::serve(config, args).await,
    }
}

async fn extract_offer(config: &Config, args: ExtractOfferArgs) -> Result<()> {
    if !args.pdf.is_file() {
        bail!("offer PDF not found: {}", args.pdf.display());
    }
    let llm = extraction_client(config)?;
    let extracted = extractor::extract_offer(&llm, &args.pdf)
        .await
        .with_context(|| format!("extracting {}", args.pdf.display()))?;

    let out_dir = args
        .out
        .unwrap_or_else(|| offers::default_out_dir(&config.data_dir));
    let path = extractor::save_offer(&extracted, &out_dir)?;
    print_json(&extracted)?;
    info!(path = %path.display(), "offer JSON written");

    if args.persist {
        persist_offer(config, &extracted, &path).await?;
    }
    Ok(())
}

async fn persist_offer(
    config: &Config,
    extracted: &ExtractedOffer,
    json_path: &Path,
) -> Result<()> {
    let Some(new_offer) = NewOffer::from_extracted(extracted) else {
        warn!(path = %json_path.display(), "placeholder offer not stored");
        return Ok(());
    };
    let repo = OfferRepository::open(&config.database_url).await?;
    let offer = repo.insert(&new_offer).await?;
    info!(id = offer.id, reference = %offer.reference, "offer stored");
    Ok(())
}
