use crate::error::{GuideCoverError, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

const HEADER_PREFIX: &str = "Total number of reads:";

/// Whether the `Total number of reads: <N>` header line must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Use the header when the first line carries one, otherwise infer the total.
    #[default]
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub header: HeaderPolicy,
}

/// Sites and the reads each one hits, as produced by the site finder.
///
/// `sites[i]` labels `reads[i]`. Each read list holds distinct indices in
/// first-seen order, all below `total_reads`.
#[derive(Debug, Clone, Default)]
pub struct SiteMapping {
    pub sites: Vec<String>,
    pub reads: Vec<Vec<usize>>,
    pub total_reads: usize,
    /// The header value, if the input had one.
    pub declared_total: Option<usize>,
}

impl SiteMapping {
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Largest number of distinct reads hit by a single site.
    pub fn max_reads_per_site(&self) -> usize {
        self.reads.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn position(&self, site: &str) -> Option<usize> {
        self.sites.iter().position(|s| s == site)
    }
}

fn parse_header(line: &str) -> Option<Result<usize>> {
    let rest = line.trim().strip_prefix(HEADER_PREFIX)?;
    Some(
        rest.trim()
            .parse::<usize>()
            .map_err(|e| GuideCoverError::malformed(1, format!("bad read total {:?}: {}", rest.trim(), e))),
    )
}

/// Parse one `<site> <read> <read> ...` record, dropping repeated read indices.
fn parse_record(line: &str, line_no: usize, seen: &mut HashSet<usize>) -> Result<(String, Vec<usize>)> {
    let mut fields = line.split_whitespace();
    let site = fields
        .next()
        .ok_or_else(|| GuideCoverError::malformed(line_no, "empty site record"))?;

    seen.clear();
    let mut reads = Vec::new();
    for field in fields {
        let read = field
            .parse::<usize>()
            .map_err(|e| GuideCoverError::malformed(line_no, format!("bad read index {:?}: {}", field, e)))?;
        // A site can hit the same read more than once.
        if seen.insert(read) {
            reads.push(read);
        }
    }
    Ok((site.to_string(), reads))
}

/// Load a sites-to-reads mapping from any buffered source.
pub fn read_mapping<R: BufRead>(reader: R, options: LoadOptions) -> Result<SiteMapping> {
    let mut mapping = SiteMapping::default();
    let mut max_read: Option<usize> = None;
    let mut seen = HashSet::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;

        if i == 0 {
            if let Some(total) = parse_header(&line) {
                mapping.declared_total = Some(total?);
                continue;
            }
            if options.header == HeaderPolicy::Required {
                return Err(GuideCoverError::MissingHeader);
            }
        }

        let (site, reads) = parse_record(&line, line_no, &mut seen)?;
        if let Some(&m) = reads.iter().max() {
            if let Some(total) = mapping.declared_total {
                if m >= total {
                    return Err(GuideCoverError::malformed(
                        line_no,
                        format!("read {} is outside the declared total of {} reads", m, total),
                    ));
                }
            }
            max_read = max_read.max(Some(m));
        }
        mapping.sites.push(site);
        mapping.reads.push(reads);
    }

    if options.header == HeaderPolicy::Required && mapping.declared_total.is_none() {
        return Err(GuideCoverError::MissingHeader);
    }

    mapping.total_reads = match mapping.declared_total {
        Some(total) => total,
        None => max_read.map_or(0, |m| m + 1),
    };
    debug!(
        "Parsed {} sites, read population {}",
        mapping.len(),
        mapping.total_reads
    );
    Ok(mapping)
}

pub fn load_mapping(path: &Path, options: LoadOptions) -> Result<SiteMapping> {
    info!("Reading candidate sites from {}", path.display());
    let mapping = read_mapping(crate::io::open(path)?, options)?;
    info!(
        "Loaded {} sites; largest # of reads hit by a single site is {}",
        mapping.len(),
        mapping.max_reads_per_site()
    );
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str, header: HeaderPolicy) -> Result<SiteMapping> {
        read_mapping(text.as_bytes(), LoadOptions { header })
    }

    #[test]
    fn test_basic_mapping() {
        let m = load("AAA 1 2 3\nCCC 3 4\nGGG 1\n", HeaderPolicy::Optional).unwrap();
        assert_eq!(m.sites, vec!["AAA", "CCC", "GGG"]);
        assert_eq!(m.reads, vec![vec![1, 2, 3], vec![3, 4], vec![1]]);
        assert_eq!(m.total_reads, 5);
        assert_eq!(m.declared_total, None);
        assert_eq!(m.max_reads_per_site(), 3);
    }

    #[test]
    fn test_duplicate_reads_collapsed() {
        let m = load("AAA 7 2 7 7 2 9\n", HeaderPolicy::Optional).unwrap();
        assert_eq!(m.reads[0], vec![7, 2, 9]);
    }

    #[test]
    fn test_header_sets_total() {
        let m = load("Total number of reads: 100\nAAA 1 2\n", HeaderPolicy::Required).unwrap();
        assert_eq!(m.declared_total, Some(100));
        assert_eq!(m.total_reads, 100);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_missing_required_header() {
        let err = load("AAA 1 2\n", HeaderPolicy::Required).unwrap_err();
        assert!(matches!(err, GuideCoverError::MissingHeader));

        let err = load("", HeaderPolicy::Required).unwrap_err();
        assert!(matches!(err, GuideCoverError::MissingHeader));
    }

    #[test]
    fn test_read_beyond_declared_total() {
        let err = load("Total number of reads: 3\nAAA 1 3\n", HeaderPolicy::Optional).unwrap_err();
        assert!(matches!(err, GuideCoverError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_blank_line_is_malformed() {
        let err = load("AAA 1\n\nCCC 2\n", HeaderPolicy::Optional).unwrap_err();
        assert!(matches!(err, GuideCoverError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_bad_read_index() {
        let err = load("AAA 1 x\n", HeaderPolicy::Optional).unwrap_err();
        assert!(matches!(err, GuideCoverError::MalformedInput { line: 1, .. }));

        let err = load("AAA -4\n", HeaderPolicy::Optional).unwrap_err();
        assert!(matches!(err, GuideCoverError::MalformedInput { line: 1, .. }));
    }

    #[test]
    fn test_site_without_reads() {
        let m = load("AAA\nCCC 0\n", HeaderPolicy::Optional).unwrap();
        assert!(m.reads[0].is_empty());
        assert_eq!(m.total_reads, 1);
        assert_eq!(m.position("CCC"), Some(1));
        assert_eq!(m.position("TTT"), None);
    }
}
