//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Find and download past exam papers.
///
/// Papergrab crawls exam-paper archives for a subject's papers and
/// downloads them in parallel, restarting transfers that stall.
#[derive(Parser, Debug)]
#[command(name = "papergrab")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum concurrent downloads (1-1000) [default: 150]
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub max_active: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the supported archives
    Sites,

    /// List the levels a site offers
    Levels(SiteArgs),

    /// List the subjects of a level
    Subjects(LevelArgs),

    /// Crawl a subject's papers and optionally download them
    Papers(PapersArgs),

    /// Download files by URL
    Get(GetArgs),
}

/// Site selection.
#[derive(ClapArgs, Debug, Clone)]
pub struct SiteArgs {
    /// Site id (see `papergrab sites`) [default: gceguide]
    #[arg(short, long)]
    pub site: Option<String>,
}

/// Site and level selection.
#[derive(ClapArgs, Debug, Clone)]
pub struct LevelArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Level name, e.g. IGCSE
    #[arg(short, long)]
    pub level: String,
}

/// Options for `papers`.
#[derive(ClapArgs, Debug, Clone)]
pub struct PapersArgs {
    #[command(flatten)]
    pub level: LevelArgs,

    /// Subject name or four-digit code, e.g. 0625
    #[arg(long)]
    pub subject: String,

    /// Keep only papers whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print the paper list as JSON
    #[arg(long)]
    pub json: bool,

    /// Download the papers into this directory
    #[arg(short, long, value_name = "DIR")]
    pub download: Option<PathBuf>,
}

/// Options for `get`.
#[derive(ClapArgs, Debug, Clone)]
pub struct GetArgs {
    /// URLs to download
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output directory [default: config `output_dir` or current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_sites_parses() {
        let args = Args::try_parse_from(["papergrab", "sites"]).unwrap();
        assert!(matches!(args.command, Command::Sites));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.max_active.is_none());
    }

    #[test]
    fn test_cli_subcommand_required() {
        let result = Args::try_parse_from(["papergrab"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["papergrab", "-v", "sites"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["papergrab", "sites", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["papergrab", "--quiet", "sites"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["papergrab", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["papergrab", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_max_active_range() {
        let args = Args::try_parse_from(["papergrab", "--max-active", "1000", "sites"]).unwrap();
        assert_eq!(args.max_active, Some(1000));

        for value in ["0", "1001"] {
            let err =
                Args::try_parse_from(["papergrab", "--max-active", value, "sites"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_levels_site_optional() {
        let args = Args::try_parse_from(["papergrab", "levels"]).unwrap();
        let Command::Levels(site) = args.command else {
            panic!("expected levels");
        };
        assert!(site.site.is_none());

        let args = Args::try_parse_from(["papergrab", "levels", "-s", "papacambridge"]).unwrap();
        let Command::Levels(site) = args.command else {
            panic!("expected levels");
        };
        assert_eq!(site.site.as_deref(), Some("papacambridge"));
    }

    #[test]
    fn test_cli_subjects_requires_level() {
        let err = Args::try_parse_from(["papergrab", "subjects"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_papers_all_options() {
        let args = Args::try_parse_from([
            "papergrab",
            "papers",
            "--site",
            "gceguide",
            "--level",
            "IGCSE",
            "--subject",
            "0625",
            "--filter",
            "s21",
            "--json",
            "--download",
            "out",
        ])
        .unwrap();
        let Command::Papers(papers) = args.command else {
            panic!("expected papers");
        };
        assert_eq!(papers.level.site.site.as_deref(), Some("gceguide"));
        assert_eq!(papers.level.level, "IGCSE");
        assert_eq!(papers.subject, "0625");
        assert_eq!(papers.filter.as_deref(), Some("s21"));
        assert!(papers.json);
        assert_eq!(papers.download, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_cli_get_requires_url() {
        let err = Args::try_parse_from(["papergrab", "get"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from([
            "papergrab",
            "get",
            "https://a.example/x.pdf",
            "https://a.example/y.pdf",
            "-o",
            "dl",
        ])
        .unwrap();
        let Command::Get(get) = args.command else {
            panic!("expected get");
        };
        assert_eq!(get.urls.len(), 2);
        assert_eq!(get.output, Some(PathBuf::from("dl")));
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["papergrab", "--invalid-flag", "sites"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
