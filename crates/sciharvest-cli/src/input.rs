//! Identifier list loading
//!
//! One identifier per line. For `.csv` files the first column is used and a
//! leading `identifier` header is skipped. Blank lines and `#` comments are
//! ignored everywhere.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use sciharvest_pipeline::Identifier;

/// Read identifiers from `path`, or stdin when `path` is `-`.
pub fn load(path: &Path) -> Result<Vec<Identifier>> {
    let csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let reader: Box<dyn Read> = if path == Path::new("-") {
        Box::new(std::io::stdin())
    } else {
        Box::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open input: {}", path.display()))?,
        )
    };
    let identifiers = parse(BufReader::new(reader), csv)
        .with_context(|| format!("Failed to read input: {}", path.display()))?;
    log::info!("Loaded {} identifiers from {}", identifiers.len(), path.display());
    Ok(identifiers)
}

fn parse(reader: impl BufRead, csv: bool) -> std::io::Result<Vec<Identifier>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut duplicates = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value = if csv { first_column(line) } else { line };
        if csv && lineno == 0 && value.eq_ignore_ascii_case("identifier") {
            continue;
        }
        if value.is_empty() {
            continue;
        }
        if !seen.insert(value.to_string()) {
            log::debug!("line {}: duplicate identifier {value:?}", lineno + 1);
            duplicates += 1;
            continue;
        }
        out.push(Identifier::new(value));
    }

    if duplicates > 0 {
        log::warn!("Dropped {duplicates} duplicate identifiers");
    }
    Ok(out)
}

/// First CSV field without its surrounding quotes (escaped `""` left as-is)
fn first_column(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('"') {
        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                return rest[..i].trim();
            }
            i += 1;
        }
        return rest.trim();
    }
    line.split(',').next().unwrap_or_default().trim()
}
