//! Plain-text ranked report
//!
//! One line per article of a single site, highest score first: the score
//! right-aligned in a seven character column, a space, then the URL.

use crate::storage::ArticleStore;
use crate::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes the ranked report of `site` to any writer, returning the number
/// of lines
pub fn write_report<W: Write>(
    storage: &dyn ArticleStore,
    site: &str,
    mut out: W,
) -> Result<usize> {
    let articles = storage.ranked_articles(site, None)?;

    for article in &articles {
        writeln!(out, "{:>7} {}", article.score, article.url)?;
    }
    out.flush()?;

    Ok(articles.len())
}

/// Writes the ranked report to a file, or to stdout when no path is given
pub fn export_report(
    storage: &dyn ArticleStore,
    site: &str,
    path: Option<&Path>,
) -> Result<usize> {
    match path {
        Some(path) => {
            let lines = write_report(storage, site, BufWriter::new(File::create(path)?))?;
            tracing::info!(
                "Wrote {} ranked {} articles to {}",
                lines,
                site,
                path.display()
            );
            Ok(lines)
        }
        None => write_report(storage, site, io::stdout().lock()),
    }
}
