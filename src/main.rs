use clap::{Parser, Subcommand, ValueEnum};
use guidecover::mapping::{self, HeaderPolicy, LoadOptions};
use guidecover::report;
use guidecover::sampler::{self, SamplerConfig};
use guidecover::score::{self, ScoreConfig};
use guidecover::selector::{self, CountingPolicy, Ranking, SelectorConfig};
use guidecover::{tally, Result};
use log::info;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Pick CRISPR guides that cover the most reads")]
struct Cli {
    /// More diagnostics on stderr (-v for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report warnings and errors on stderr
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Greedily choose the sites covering the most reads
    Optimize(OptimizeArgs),
    /// Count the reads in a FASTA file hit by the guides of a report
    Score(ScoreArgs),
    /// Count the reads a guide list hits according to a sites-to-reads mapping
    Tally(TallyArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum CountingArg {
    /// Credit a site with reads it hits for the first time
    FirstTouch,
    /// Credit a site with reads it brings up to the coverage threshold
    Threshold,
}

impl From<CountingArg> for CountingPolicy {
    fn from(arg: CountingArg) -> Self {
        match arg {
            CountingArg::FirstTouch => CountingPolicy::FirstTouch,
            CountingArg::Threshold => CountingPolicy::ThresholdCrossing,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RankingArg {
    Rescan,
    Lazy,
}

impl From<RankingArg> for Ranking {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::Rescan => Ranking::Rescan,
            RankingArg::Lazy => Ranking::Lazy,
        }
    }
}

#[derive(clap::Args)]
struct OptimizeArgs {
    /// Sites-to-reads mapping produced by the site finder
    mapping: PathBuf,

    /// Number of sites to return
    num_guides: usize,

    /// Number of distinct sites that should hit each read
    coverage: u32,

    /// Reads FASTA; adds a random read hit by each site to the report
    reads: Option<PathBuf>,

    /// Fail unless the mapping starts with "Total number of reads: <N>"
    #[arg(long)]
    require_header: bool,

    /// Which reads a site is credited with in the report
    #[arg(long, value_enum, default_value = "first-touch")]
    counting: CountingArg,

    /// How the best remaining site is found after each pick
    #[arg(long, value_enum, default_value = "rescan")]
    ranking: RankingArg,

    /// Read index of the first record in the reads FASTA
    #[arg(long, default_value = "1")]
    fasta_offset: usize,

    /// Seed for picking representative reads
    #[arg(long)]
    seed: Option<u64>,

    /// Log progress every N picks (0 disables)
    #[arg(long, default_value = "20")]
    progress_every: usize,
}

#[derive(clap::Args)]
struct ScoreArgs {
    /// Guides report as written by `optimize`
    guides: PathBuf,

    /// Reads FASTA to measure guide hits against
    reads: PathBuf,

    /// PAM appended to each guide (IUPAC codes allowed, empty for none)
    #[arg(short, long, default_value = "NGG")]
    pam: String,

    /// Required guide length (0 accepts any)
    #[arg(long, default_value = "20")]
    guide_length: usize,

    /// Write hit and missed reads to <stem>_dashed.fasta and <stem>_undashed.fasta
    #[arg(short, long)]
    split: bool,

    /// Directory for split output
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Number of threads to use (default: number of logical CPUs)
    #[arg(short = 't', long)]
    threads: Option<usize>,
}

#[derive(clap::Args)]
struct TallyArgs {
    /// Sites-to-reads mapping produced by the site finder
    mapping: PathBuf,

    /// Guides report as written by `optimize`
    guides: PathBuf,
}

fn run_optimize(args: OptimizeArgs) -> Result<()> {
    info!(
        "Choosing the {} sites from {} that will cover the most reads...",
        args.num_guides,
        args.mapping.display()
    );

    let options = LoadOptions {
        header: if args.require_header {
            HeaderPolicy::Required
        } else {
            HeaderPolicy::Optional
        },
    };
    let mapping = mapping::load_mapping(&args.mapping, options)?;

    let config = SelectorConfig {
        max_guides: args.num_guides,
        threshold: args.coverage,
        counting: args.counting.into(),
        ranking: args.ranking.into(),
        progress_every: args.progress_every,
    };
    let result = selector::select_guides(&mapping, config)?;

    let sequences = match &args.reads {
        Some(path) => {
            let config = SamplerConfig {
                first_record_index: args.fasta_offset,
                seed: args.seed,
            };
            Some(sampler::representative_reads(&mapping, &result.picks, path, config)?)
        }
        None => None,
    };

    let stdout = io::stdout();
    report::write_report(
        BufWriter::new(stdout.lock()),
        &mapping,
        &result,
        sequences.as_deref(),
    )?;
    info!("{}", report::summary(&result));
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| guidecover::GuideCoverError::InvalidParameter(e.to_string()))?;
    }

    let config = ScoreConfig {
        pam: args.pam,
        guide_length: (args.guide_length > 0).then_some(args.guide_length),
        split_dir: args.split.then_some(args.out_dir),
    };
    let summary = score::score_reads(&args.guides, &args.reads, &config)?;
    println!(
        "{} guides in {} vs. {} hit {}/{} = {:.2}%",
        summary.guides,
        args.guides.display(),
        args.reads.display(),
        summary.hits,
        summary.total,
        summary.percent()
    );
    Ok(())
}

fn run_tally(args: TallyArgs) -> Result<()> {
    let mapping = mapping::load_mapping(&args.mapping, LoadOptions::default())?;
    let guides = score::load_guides(&args.guides, None)?;
    let t = tally::tally(&mapping, &guides);
    println!(
        "{} will hit {}/{} = {:.2}% reads in {}, {} guides hit no reads",
        args.guides.display(),
        t.reads_hit,
        t.total_reads,
        t.percent(),
        args.mapping.display(),
        t.missing.len()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let outcome = match cli.command {
        Command::Optimize(args) => run_optimize(args),
        Command::Score(args) => run_score(args),
        Command::Tally(args) => run_tally(args),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
