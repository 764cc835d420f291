use crate::model::Bookmark;
use crate::rules::RuleSet;
use crate::source::{BookmarkSource, Folder};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;
use std::io::Write;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    pub affected: usize,
    pub archived: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveOptions {
    pub entries_limit: u32,
    pub dry_run: bool,
}

/// Archives every unread bookmark older than its rule allows, reporting each
/// one to `out` as it is decided. Bookmarks are visited in the order the
/// source returns them and `now` is the single reference time for the run.
///
/// An archive failure aborts the loop; bookmarks already archived stay archived.
pub async fn run_archive<S, W>(
    source: &S,
    rules: &RuleSet,
    options: ArchiveOptions,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<ArchiveReport>
where
    S: BookmarkSource + ?Sized,
    W: Write,
{
    if options.dry_run {
        writeln!(out, "Listing entries which would be archived...")?;
    } else {
        writeln!(out, "Archiving old entries...")?;
    }

    let bookmarks = source
        .list_bookmarks(Folder::Unread, options.entries_limit)
        .await
        .context("failed to fetch unread bookmarks")?;
    tracing::info!(count = bookmarks.len(), dry_run = options.dry_run, "evaluating bookmarks");

    let mut report = ArchiveReport::default();
    for bookmark in &bookmarks {
        let age = now - bookmark.created_at;
        let domain = bookmark.domain()?;
        let max_age = rules.max_age(&domain);
        if age <= max_age {
            continue;
        }

        write_entry(out, bookmark, &domain, whole_days(age), whole_days(max_age))?;

        if !options.dry_run {
            source.archive(bookmark).await.with_context(|| {
                format!(
                    "failed to archive bookmark {} ({})",
                    bookmark.bookmark_id, bookmark.url
                )
            })?;
            report.archived += 1;
        }
        report.affected += 1;
    }

    writeln!(out)?;
    writeln!(out, "{} bookmarks affected.", report.affected)?;
    out.flush()?;
    Ok(report)
}

// Floors like a calendar day count, so a bookmark 12 hours in the future is -1 days old.
fn whole_days(delta: TimeDelta) -> i64 {
    delta.num_seconds().div_euclid(86_400)
}

fn write_entry<W: Write>(
    out: &mut W,
    bookmark: &Bookmark,
    domain: &str,
    age_days: i64,
    max_age_days: i64,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}: {}", domain, bookmark.title)?;
    writeln!(out, "{} days old (max age is {} days)", age_days, max_age_days)?;
    writeln!(out, "{}", bookmark.url)?;
    out.flush()?;
    Ok(())
}

/// Prints the distinct domains of the unread bookmarks, sorted, one per line.
pub async fn list_domains<S, W>(source: &S, entries_limit: u32, out: &mut W) -> Result<BTreeSet<String>>
where
    S: BookmarkSource + ?Sized,
    W: Write,
{
    let bookmarks = source
        .list_bookmarks(Folder::Unread, entries_limit)
        .await
        .context("failed to fetch unread bookmarks")?;

    let domains = bookmarks
        .iter()
        .map(Bookmark::domain)
        .collect::<Result<BTreeSet<_>>>()?;

    for domain in &domains {
        writeln!(out, "{}", domain)?;
    }
    out.flush()?;
    Ok(domains)
}
