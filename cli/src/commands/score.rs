use anyhow::{Context, Result};
use polis::{score_files, MatchConfig, RunSummary, ScoreOptions};

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let options = ScoreOptions {
        matching: MatchConfig {
            neighbors: cli.neighbors as usize,
            max_candidates: cli.max_candidates as usize,
        },
        precision: cli.precision,
        batch_size: cli.batch_size as usize,
        threads: cli.threads.map(|n| n as usize),
    };

    let summary = score_files(&cli.reference, &cli.candidate, &cli.output, &options)
        .with_context(|| format!(
            "failed to score {} against {}",
            cli.candidate.display(), cli.reference.display(),
        ))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary).context("failed to encode summary")?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Number of matches: {}", summary.matches);
    println!("Number of misses: {}", summary.misses);
    println!("Duplicate matches: {}", summary.duplicates);
}
