//! Listing commands: sites, levels and subjects.

use anyhow::{Context as _, Result};
use papergrab_core::{Level, SiteAdapter, all_sites};

use super::Context;
use crate::cli::{LevelArgs, SiteArgs};

pub fn run_sites_command(context: &Context) -> Result<()> {
    for site in all_sites(&context.client) {
        let marker = if site.id() == context.default_site {
            " (default)"
        } else {
            ""
        };
        println!("{:<15} {}{marker}", site.id(), site.name());
    }
    Ok(())
}

pub fn run_levels_command(context: &Context, args: &SiteArgs) -> Result<()> {
    let site = context.site(args.site.as_deref())?;
    for level in site.levels() {
        println!("{}", level.name);
    }
    Ok(())
}

pub async fn run_subjects_command(context: &Context, args: &LevelArgs) -> Result<()> {
    let site = context.site(args.site.site.as_deref())?;
    let level = resolve_level(site.as_ref(), &args.level)?;
    let subjects = site
        .subjects(&level)
        .await
        .with_context(|| format!("Failed to list {} subjects on {}", level.name, site.name()))?;

    for subject in &subjects {
        println!("{:<6} {}", subject.code().unwrap_or("-"), subject.name);
    }
    Ok(())
}

/// Finds a level by name or fails with the list of valid names.
pub(crate) fn resolve_level(site: &dyn SiteAdapter, name: &str) -> Result<Level> {
    site.level(name).with_context(|| {
        let known: Vec<_> = site.levels().into_iter().map(|l| l.name).collect();
        format!(
            "Unknown level '{name}' on {}. Expected one of: {}",
            site.name(),
            known.join(", ")
        )
    })
}
