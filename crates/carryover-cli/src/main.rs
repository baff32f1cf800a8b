//! Command-line front end for carrying Anki scheduling state between
//! templates.
//!
//! Close Anki (or at least make sure it is not syncing) before running a
//! transfer against its collection file.

use std::path::{Path, PathBuf};

use carryover::index::DuplicatePolicy;
use carryover::resolve::{TemplateMatch, TemplateSpec};
use carryover::transfer::{ReviewLogPolicy, SiblingPolicy, TransferJob, TransferOptions};
use carryover::{Engine, JobFile, SqliteStore};
use clap::{Parser, Subcommand};
use tracing::{error, info};

// ============================================================================
// CLI Arguments
// ============================================================================

/// Carry review progress from one Anki note template to another.
#[derive(Parser, Debug)]
#[command(name = "carryover")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the collection file (collection.anki2)
    #[arg(short, long, global = true)]
    collection: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer scheduling from a source template to a target template
    Transfer {
        /// Field whose value pairs source and target cards
        #[arg(long)]
        field: String,

        /// Note type of the source template
        #[arg(long)]
        source_note_type: String,

        /// Source template name
        #[arg(long)]
        source_template: String,

        /// Note type of the target template
        #[arg(long)]
        target_note_type: String,

        /// Target template name
        #[arg(long)]
        target_template: String,

        #[command(flatten)]
        policies: PolicyArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run every transfer of a TOML job file in order
    Run {
        /// Job file
        jobs: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List every template of every note type
    Templates {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the cards of a note type with their templates
    Cards {
        /// Note type name
        #[arg(long)]
        note_type: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the due value of a card
    Due {
        /// Card ID
        card_id: i64,
    },
}

#[derive(clap::Args, Debug)]
struct PolicyArgs {
    /// Which target card wins a shared value: last-seen, first-seen or reject
    #[arg(long, default_value = "last-seen")]
    duplicates: DuplicatePolicy,

    /// Note types sharing a name: first or unique
    #[arg(long, default_value = "first")]
    template_match: TemplateMatch,

    /// Review history of retired card IDs: discard or keep
    #[arg(long, default_value = "discard")]
    review_log: ReviewLogPolicy,

    /// Other cards of merged source notes: keep (delete the note with its
    /// last card) or delete
    #[arg(long, default_value = "keep")]
    siblings: SiblingPolicy,
}

impl From<&PolicyArgs> for TransferOptions {
    fn from(args: &PolicyArgs) -> Self {
        TransferOptions {
            template_match: args.template_match,
            duplicates: args.duplicates,
            review_log: args.review_log,
            siblings: args.siblings,
        }
    }
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Show what would be merged without changing the collection
    #[arg(long)]
    dry_run: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Commands
// ============================================================================

fn open(collection: Option<&Path>) -> Result<Engine<SqliteStore>, Box<dyn std::error::Error>> {
    let path = collection.ok_or("no collection given; use --collection")?;
    info!(collection = %path.display(), "opening collection");
    Ok(Engine::open(path)?)
}

fn run_job(
    engine: &mut Engine<SqliteStore>,
    job: &TransferJob,
    output: &OutputArgs,
) -> carryover::Result<serde_json::Value> {
    let result = if output.dry_run {
        engine.transfer().preview(job).and_then(|preview| {
            if !output.json {
                print!("{}", preview);
            }
            serde_json::to_value(&preview).map_err(Into::into)
        })
    } else {
        engine.transfer().run(job).and_then(|report| {
            if !output.json {
                print!("{}", report);
            }
            serde_json::to_value(&report).map_err(Into::into)
        })
    };

    if let Err(e) = &result {
        if e.is_precondition() {
            error!(error = %e, "transfer refused, collection unchanged");
        } else {
            error!(error = %e, "transfer failed and was rolled back");
        }
    }
    result
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Transfer {
            field,
            source_note_type,
            source_template,
            target_note_type,
            target_template,
            policies,
            output,
        } => {
            let job = TransferJob::new(
                field.as_str(),
                TemplateSpec::new(source_note_type.as_str(), source_template.as_str()),
                TemplateSpec::new(target_note_type.as_str(), target_template.as_str()),
            )
            .with_options(policies.into());

            let mut engine = open(args.collection.as_deref())?;
            let value = run_job(&mut engine, &job, output)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }

        Command::Run { jobs, output } => {
            let file = JobFile::from_file(jobs)?;
            // The command line wins over the job file.
            let collection = args.collection.as_deref().or(file.collection.as_deref());
            let mut engine = open(collection)?;

            let mut results = Vec::with_capacity(file.transfers.len());
            for (i, job) in file.transfers.iter().enumerate() {
                info!(job = i + 1, total = file.transfers.len(), "running transfer");
                match run_job(&mut engine, job, output) {
                    Ok(value) => results.push(value),
                    Err(e) => {
                        if i > 0 && !output.dry_run {
                            error!(completed = i, "earlier transfers were committed");
                        }
                        return Err(format!("transfer #{}: {}", i + 1, e).into());
                    }
                }
            }

            if output.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }

        Command::Templates { json } => {
            let engine = open(args.collection.as_deref())?;
            let templates = engine.inspect().templates()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else {
                for t in &templates {
                    println!("{}\t{}\t{}\t{}", t.note_type_id, t.note_type, t.ord, t.template);
                }
            }
        }

        Command::Cards { note_type, json } => {
            let engine = open(args.collection.as_deref())?;
            let cards = engine.inspect().cards(note_type)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else {
                for c in &cards {
                    println!(
                        "{}\t{}\t{}\t{}",
                        c.card_id,
                        c.ord,
                        c.template.as_deref().unwrap_or("?"),
                        c.due
                    );
                }
            }
        }

        Command::Due { card_id } => {
            let engine = open(args.collection.as_deref())?;
            println!("{}", engine.inspect().card_due(*card_id)?);
        }
    }

    Ok(())
}
