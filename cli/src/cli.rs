use std::path::PathBuf;

/// Score candidate polygons against a reference set with the polis metric
#[derive(clap::Parser, Debug)]
#[command(name = "polis", version, about)]
pub struct Cli {
    /// Reference polygons (.shp, .geojson or .json)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub reference: PathBuf,

    /// Candidate polygons to score against the reference
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub candidate: PathBuf,

    /// Output file: the candidate geometries with a `polis` attribute
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Maximum number of nearby references scored per candidate
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_candidates: u64,

    /// Number of nearest reference boxes to consider (ties always included)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub neighbors: u64,

    /// Decimal places kept for the written score
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub precision: u8,

    /// Candidates read and scored per batch
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// Worker threads, defaults to one per core
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
