//! CLI command handlers.

mod browse;
mod download;
mod papers;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use papergrab_core::queue::QueueConfig;
use papergrab_core::{FetchTimeouts, HttpClient, SiteAdapter, site_by_id};

use crate::app_config::FileConfig;
use crate::cli::{Args, GetArgs};

pub use browse::{run_levels_command, run_sites_command, run_subjects_command};
pub use papers::run_papers_command;

/// Site used when neither the CLI nor the config file names one.
const DEFAULT_SITE: &str = "gceguide";

/// Settings resolved from CLI flags, config file and built-in defaults.
#[derive(Debug, Clone)]
pub struct Context {
    pub client: HttpClient,
    pub queue_config: QueueConfig,
    pub default_site: String,
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

impl Context {
    /// Merges CLI flags over file values over defaults.
    pub fn new(args: &Args, file: &FileConfig) -> Result<Self> {
        let defaults = FetchTimeouts::default();
        let timeouts = FetchTimeouts {
            connect: file
                .connect_timeout_secs
                .map_or(defaults.connect, Duration::from_secs),
            page: file
                .page_timeout_secs
                .map_or(defaults.page, Duration::from_secs),
        };

        let mut queue_config = QueueConfig::default();
        if let Some(max_active) = args.max_active.map(usize::from).or(file.max_active) {
            queue_config.max_active = max_active;
        }
        if let Some(ms) = file.stall_floor_ms {
            queue_config.stall_floor = Duration::from_millis(ms);
        }
        if let Some(ms) = file.stall_per_active_ms {
            queue_config.stall_per_active = Duration::from_millis(ms);
        }
        queue_config
            .validate()
            .context("Invalid download queue settings")?;

        Ok(Self {
            client: HttpClient::with_timeouts(timeouts),
            queue_config,
            default_site: file.site.clone().unwrap_or_else(|| DEFAULT_SITE.to_string()),
            output_dir: file.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            show_progress: !args.quiet && io::stderr().is_terminal(),
        })
    }

    /// Looks up the requested site, or the default one.
    pub fn site(&self, requested: Option<&str>) -> Result<Box<dyn SiteAdapter>> {
        let id = requested.unwrap_or(&self.default_site);
        site_by_id(id, &self.client).with_context(|| {
            format!("Unknown site '{id}'. Run `papergrab sites` to list supported sites")
        })
    }
}

/// Downloads the given URLs.
pub async fn run_get_command(context: &Context, args: &GetArgs) -> Result<()> {
    let dir = args.output.clone().unwrap_or_else(|| context.output_dir.clone());
    download::download_urls(context, &args.urls, &dir).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["papergrab"];
        argv.extend_from_slice(extra);
        argv.push("sites");
        Args::try_parse_from(argv).expect("args should parse")
    }

    #[test]
    fn test_context_defaults() {
        let context = Context::new(&args(&[]), &FileConfig::default()).expect("defaults are valid");
        assert_eq!(context.queue_config, QueueConfig::default());
        assert_eq!(context.default_site, "gceguide");
        assert_eq!(context.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_context_cli_overrides_file() {
        let file = FileConfig {
            max_active: Some(20),
            stall_floor_ms: Some(2_000),
            site: Some("papacambridge".to_string()),
            ..FileConfig::default()
        };

        let context = Context::new(&args(&["--max-active", "5"]), &file).expect("valid");
        assert_eq!(context.queue_config.max_active, 5);
        assert_eq!(context.queue_config.stall_floor, Duration::from_secs(2));
        assert_eq!(context.default_site, "papacambridge");

        let context = Context::new(&args(&[]), &file).expect("valid");
        assert_eq!(context.queue_config.max_active, 20);
    }

    #[test]
    fn test_context_quiet_hides_progress() {
        let context = Context::new(&args(&["-q"]), &FileConfig::default()).expect("valid");
        assert!(!context.show_progress);
    }

    #[test]
    fn test_context_site_lookup() {
        let context = Context::new(&args(&[]), &FileConfig::default()).expect("valid");
        assert_eq!(context.site(None).expect("default site").id(), "gceguide");
        assert_eq!(
            context.site(Some("papacambridge")).expect("known site").id(),
            "papacambridge"
        );
        let err = context.site(Some("nope")).err().expect("unknown site");
        assert!(err.to_string().contains("Unknown site 'nope'"));
    }
}
