use crate::error::Result;
use crate::mapping::SiteMapping;
use crate::selector::SelectionResult;
use std::io::{Read, Write};

pub const HEADER: &str = "Site, Site index, Number of reads covered by site, cumulative number of reads covered";
pub const READ_COLUMN: &str = "random read hit by this guide";

/// Write one row per selected site, in selection order.
///
/// `sequences`, when given, is index-aligned with `result.picks`; a missing
/// sequence leaves the last column empty.
pub fn write_report<W: Write>(
    mut out: W,
    mapping: &SiteMapping,
    result: &SelectionResult,
    sequences: Option<&[Option<String>]>,
) -> Result<()> {
    match sequences {
        Some(_) => writeln!(out, "{}, {}", HEADER, READ_COLUMN)?,
        None => writeln!(out, "{}", HEADER)?,
    }

    let cumulative = result.cumulative();
    for (i, (pick, total)) in result.picks.iter().zip(cumulative).enumerate() {
        write!(
            out,
            "{}, {}, {}, {}",
            mapping.sites[pick.site], pick.site, pick.newly_covered, total
        )?;
        if let Some(seqs) = sequences {
            write!(out, ", {}", seqs.get(i).and_then(|s| s.as_deref()).unwrap_or(""))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

pub fn summary(result: &SelectionResult) -> String {
    format!(
        "{} sites covered {} reads, # reads: {}",
        result.picks.len(),
        result.total_covered(),
        result.total_reads()
    )
}

/// Site labels from the first column of a report, header skipped.
pub fn read_sites<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sites = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(site) = record.get(0).filter(|s| !s.is_empty()) {
            sites.push(site.to_string());
        }
    }
    Ok(sites)
}
