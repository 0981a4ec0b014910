use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use pubg_telemetry_sim::archive::SnapshotArchive;
use pubg_telemetry_sim::config::{self, ServerConfig};
use pubg_telemetry_sim::stats::BatchSummary;
use pubg_telemetry_sim::{server, GeneratorConfig, TelemetryDocument, TelemetryGenerator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pubg-telemetry")]
#[command(about = "Synthetic battle-royale match telemetry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a batch of matches to a JSON artifact
    Generate {
        /// Number of matches (defaults to the variant's batch size)
        #[arg(short, long)]
        count: Option<usize>,

        #[arg(short, long, default_value = "public/mock_telemetry.json")]
        output: PathBuf,

        /// Fixed seed for a reproducible batch
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum, default_value_t = Variant::Mock)]
        variant: Variant,

        /// Balance-patch JSON replacing the built-in tables
        #[arg(long, env = "TELEMETRY_META")]
        meta: Option<PathBuf>,
    },

    /// Serve on-demand batches over HTTP
    Serve {
        #[arg(long, env = "TELEMETRY_META")]
        meta: Option<PathBuf>,
    },

    /// Copy fetched telemetry into the dated snapshot archive
    Archive {
        #[arg(short, long, default_value = "public/real_telemetry.json")]
        input: PathBuf,

        #[arg(long, default_value = "public/data/archive")]
        archive_dir: PathBuf,

        #[arg(long, default_value = "public/data/snapshots.json")]
        manifest: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Variant {
    /// Sequential ids, versioned envelope
    Mock,
    /// Timestamped ids, metadata envelope
    Dynamic,
}

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Generate {
            count,
            output,
            seed,
            variant,
            meta,
        } => cmd_generate(count, output, seed, variant, meta),
        Commands::Serve { meta } => cmd_serve(meta),
        Commands::Archive {
            input,
            archive_dir,
            manifest,
        } => cmd_archive(input, archive_dir, manifest),
    }
}

fn cmd_generate(
    count: Option<usize>,
    output: PathBuf,
    seed: Option<u64>,
    variant: Variant,
    meta: Option<PathBuf>,
) -> Result<()> {
    let meta = config::load_meta(meta.as_deref())?;
    let now = Utc::now();
    let generator_config = match variant {
        Variant::Mock => GeneratorConfig::mock_script(),
        Variant::Dynamic => GeneratorConfig::api_route(u64::try_from(now.timestamp_millis()).unwrap_or_default()),
    };
    let count = count.unwrap_or(generator_config.batch_size);

    let generator = TelemetryGenerator::new(meta, generator_config)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!(count, ?variant, "Generating telemetry");
    let matches = generator.generate_matches(count, &mut rng);
    let summary = BatchSummary::from_matches(&matches);

    let document = match variant {
        Variant::Mock => TelemetryDocument::mock(matches),
        Variant::Dynamic => TelemetryDocument::dynamic(matches, now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    };
    document
        .write_to(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(path = %output.display(), matches = summary.total_matches, "Wrote telemetry");
    log_summary(&summary);
    Ok(())
}

fn log_summary(summary: &BatchSummary) {
    for share in &summary.archetypes {
        tracing::info!(
            archetype = share.archetype.as_str(),
            count = share.count,
            percentage = share.percentage,
            "Archetype distribution"
        );
    }
    for weapon in &summary.weapons {
        tracing::info!(
            weapon = %weapon.weapon,
            picks = weapon.picks,
            win_rate = weapon.win_rate,
            "Weapon balance"
        );
    }
    tracing::info!(
        hot_drop_rate = summary.hot_drop_rate(),
        early_death_rate = summary.early_death_rate(),
        "Landing outcomes"
    );
}

fn cmd_serve(meta: Option<PathBuf>) -> Result<()> {
    let mut config = ServerConfig::from_env()?;
    if meta.is_some() {
        config.meta_path = meta;
    }

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server::serve(config))?;
    Ok(())
}

fn cmd_archive(input: PathBuf, archive_dir: PathBuf, manifest: PathBuf) -> Result<()> {
    let archive = SnapshotArchive::new(archive_dir, manifest);
    let entry = archive
        .archive_file(&input)
        .with_context(|| format!("archiving {}", input.display()))?;

    tracing::info!(
        id = %entry.id,
        label = %entry.label,
        matches = entry.matches,
        source = ?entry.source,
        "Snapshot archived"
    );
    Ok(())
}
