//! `papers` command: crawl a subject, print or download its papers.

use anyhow::{Context as _, Result, bail};
use papergrab_core::{Resource, SiteAdapter, Subject};
use tracing::info;

use super::browse::resolve_level;
use super::{Context, download};
use crate::cli::PapersArgs;
use crate::progress;

pub async fn run_papers_command(context: &Context, args: &PapersArgs) -> Result<()> {
    let site = context.site(args.level.site.site.as_deref())?;
    let subject = resolve_subject(site.as_ref(), &args.level.level, &args.subject).await?;

    let bar = progress::crawl_bar(context.show_progress, &subject.name);
    let on_progress = {
        let bar = bar.clone();
        move |percent: u8| bar.set_position(u64::from(percent))
    };
    let crawled = site.papers(&subject, &on_progress).await;
    bar.finish_and_clear();
    let papers = crawled.with_context(|| format!("Failed to crawl papers for {}", subject.name))?;

    let papers = filter_papers(papers, args.filter.as_deref());
    info!(
        subject = %subject.name,
        papers = papers.len(),
        "Paper list ready"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&papers)?);
    } else if args.download.is_none() {
        for paper in &papers {
            println!("{}\t{}", paper.name, paper.url);
        }
    }

    if let Some(dir) = &args.download {
        download::download_resources(context, &papers, dir).await?;
    }
    Ok(())
}

async fn resolve_subject(site: &dyn SiteAdapter, level: &str, query: &str) -> Result<Subject> {
    let level = resolve_level(site, level)?;
    let subjects = site
        .subjects(&level)
        .await
        .with_context(|| format!("Failed to list {} subjects on {}", level.name, site.name()))?;

    let Some(subject) = subjects.into_iter().find(|subject| subject.matches(query)) else {
        bail!(
            "No {} subject matches '{query}'. Run `papergrab subjects --level \"{}\"` to list them",
            level.name,
            level.name
        );
    };
    Ok(subject)
}

/// Keeps papers whose name contains `needle`, ignoring case.
fn filter_papers(papers: Vec<Resource>, needle: Option<&str>) -> Vec<Resource> {
    let Some(needle) = needle.map(str::to_lowercase) else {
        return papers;
    };
    papers
        .into_iter()
        .filter(|paper| paper.name.to_lowercase().contains(&needle))
        .collect()
}
