use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use garage_actors::{
    EventFormatter, JsonLinesFormatter, SilentFormatter, TableFormatter, Workshop,
};
use garage_core::{
    CategoryMix, JobGenerator, MixGenerator, Phase, RandomGenerator, RunReport, WorkshopConfig,
};

#[derive(Parser, Debug)]
#[command(name = "garage")]
#[command(version)]
#[command(about = "Simulated vehicle workshop with prioritized phase pipelines")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run one simulation and print every lifecycle event
    Run {
        #[command(flatten)]
        workshop: WorkshopArgs,

        /// Fixed category mix "mechanical,electrical,bodywork" instead of random jobs
        #[arg(long)]
        mix: Option<CategoryMix>,

        /// Event output format
        #[arg(long, short = 'f', default_value = "table")]
        format: OutputFormat,
    },

    /// Run a category mix several times and report the mean run time
    Bench {
        #[command(flatten)]
        workshop: WorkshopArgs,

        /// Category mix "mechanical,electrical,bodywork"
        #[arg(long, default_value = "10,10,10")]
        mix: CategoryMix,

        /// Number of runs to average over
        #[arg(long, default_value = "3")]
        runs: u32,
    },
}

// =============================================================================
// Workshop Arguments (shared by run and bench)
// =============================================================================

#[derive(Parser, Debug)]
struct WorkshopArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of jobs to generate
    #[arg(long)]
    jobs: Option<usize>,

    /// Garage capacity (cars in flight at once)
    #[arg(long)]
    slots: Option<usize>,

    /// Specialized workers staffing the repair phase
    #[arg(long)]
    mechanics: Option<usize>,

    /// Repair workers (defaults to --mechanics)
    #[arg(long)]
    repair_workers: Option<usize>,

    /// Documentation workers (defaults to the slot count)
    #[arg(long)]
    doc_workers: Option<usize>,

    /// Cleaning workers (defaults to the slot count)
    #[arg(long)]
    cleaning_workers: Option<usize>,

    /// Delivery workers (defaults to the slot count)
    #[arg(long)]
    delivery_workers: Option<usize>,

    /// Wall-clock milliseconds per service time unit
    #[arg(long)]
    time_unit_ms: Option<u64>,

    /// Seed for reproducible job generation
    #[arg(long)]
    seed: Option<u64>,

    /// Free the slot as soon as delivery ends
    #[arg(long)]
    no_handover: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Silent,
}

impl OutputFormat {
    fn formatter(self) -> Box<dyn EventFormatter> {
        match self {
            OutputFormat::Table => Box::new(TableFormatter::stdout()),
            OutputFormat::Json => Box::new(JsonLinesFormatter::stdout()),
            OutputFormat::Silent => Box::new(SilentFormatter),
        }
    }
}

impl WorkshopArgs {
    /// Defaults, then the config file, then flags.
    fn load(&self) -> Result<WorkshopConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => WorkshopConfig::from_json_file(path)?,
            None => WorkshopConfig::default(),
        };

        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        if let Some(slots) = self.slots {
            config = config.with_slots(slots);
        }
        if let Some(mechanics) = self.mechanics {
            config = config.with_specialized_workers(mechanics);
        }
        for (phase, size) in [
            (Phase::Documentation, self.doc_workers),
            (Phase::Repair, self.repair_workers),
            (Phase::Cleaning, self.cleaning_workers),
            (Phase::Delivery, self.delivery_workers),
        ] {
            if let Some(size) = size {
                config = config.with_pool_size(phase, size);
            }
        }
        if let Some(ms) = self.time_unit_ms {
            config = config.with_time_unit(Duration::from_millis(ms));
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.no_handover {
            config = config.with_delivery_handover(false);
        }
        Ok(config)
    }
}

fn generator_for(config: &WorkshopConfig, mix: Option<CategoryMix>) -> Box<dyn JobGenerator> {
    match (mix, config.seed) {
        (Some(mix), seed) => Box::new(MixGenerator::new(mix, config.time_unit(), seed)),
        (None, Some(seed)) => Box::new(RandomGenerator::seeded(seed, config.time_unit())),
        (None, None) => Box::new(RandomGenerator::new(config.time_unit())),
    }
}

async fn run_once(
    args: WorkshopArgs,
    mix: Option<CategoryMix>,
    format: OutputFormat,
) -> Result<RunReport, Box<dyn Error>> {
    let mut config = args.load()?;
    if let Some(mix) = mix {
        config = config.with_jobs(mix.total());
    }

    let mut generator = generator_for(&config, mix);
    let report = Workshop::new(config)?
        .run(generator.as_mut(), format.formatter())
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Table | OutputFormat::Silent => println!("{}", report),
    }
    Ok(report)
}

async fn bench(args: WorkshopArgs, mix: CategoryMix, runs: u32) -> Result<(), Box<dyn Error>> {
    let base = args.load()?.with_jobs(mix.total());
    let runs = runs.max(1);
    tracing::info!(?mix, runs, "Starting benchmark");

    let mut total = Duration::ZERO;
    for run in 0..runs {
        let mut config = base.clone();
        if let Some(seed) = base.seed {
            config = config.with_seed(seed.wrapping_add(u64::from(run)));
        }
        let mut generator = generator_for(&config, Some(mix));
        let report = Workshop::new(config)?
            .run(generator.as_mut(), SilentFormatter)
            .await?;
        println!("run {:<3} {}", run + 1, report);
        total += report.elapsed;
    }

    let mean = total / runs;
    println!(
        "mix {},{},{}: mean {:.2}s over {} runs",
        mix.mechanical,
        mix.electrical,
        mix.bodywork,
        mean.as_secs_f64(),
        runs
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Run {
            workshop,
            mix,
            format,
        } => {
            let report = run_once(workshop, mix, format).await?;
            if !report.all_completed() {
                return Err(format!("{} jobs abandoned", report.abandoned).into());
            }
        }
        Commands::Bench {
            workshop,
            mix,
            runs,
        } => bench(workshop, mix, runs).await?,
    }

    Ok(())
}
