mod cli;
mod commands;
mod logging;

use cli::Cli;
use commands::score;

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    score::run(&cli)
}

fn main() -> anyhow::Result<()> { run() }

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::cli::Cli;

    #[test]
    fn schema_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_and_positionals() {
        let cli = Cli::try_parse_from(["polis", "ref.shp", "cmp.shp", "out.shp"]).unwrap();
        assert_eq!(cli.reference.to_str(), Some("ref.shp"));
        assert_eq!(cli.candidate.to_str(), Some("cmp.shp"));
        assert_eq!(cli.output.to_str(), Some("out.shp"));
        assert_eq!(cli.max_candidates, 5);
        assert_eq!(cli.neighbors, 1);
        assert_eq!(cli.precision, 2);
        assert_eq!(cli.threads, None);
        assert!(!cli.json);
    }

    #[test]
    fn options_and_validation() {
        let cli = Cli::try_parse_from([
            "polis", "a.geojson", "b.geojson", "c.geojson",
            "--max-candidates", "3", "-j", "2", "-vv", "--json",
        ]).unwrap();
        assert_eq!(cli.max_candidates, 3);
        assert_eq!(cli.threads, Some(2));
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);

        assert!(Cli::try_parse_from(["polis", "a.shp", "b.shp"]).is_err());
        assert!(Cli::try_parse_from(["polis", "a.shp", "b.shp", "c.shp", "--max-candidates", "0"]).is_err());
        assert!(Cli::try_parse_from(["polis", "a.shp", "b.shp", "c.shp", "--precision", "11"]).is_err());
    }
}
