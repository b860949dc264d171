use crate::mapping::SiteMapping;
use std::collections::HashMap;

/// How far an existing guide list reaches according to a sites-to-reads mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub guides: usize,
    /// Distinct reads hit by at least one listed guide.
    pub reads_hit: usize,
    /// Sum over reads of how many listed guides hit them.
    pub total_hits: usize,
    pub total_reads: usize,
    /// Listed guides that do not appear in the mapping.
    pub missing: Vec<String>,
}

impl Tally {
    pub fn percent(&self) -> f64 {
        if self.total_reads == 0 {
            0.0
        } else {
            100.0 * self.reads_hit as f64 / self.total_reads as f64
        }
    }
}

pub fn tally(mapping: &SiteMapping, guides: &[String]) -> Tally {
    let index: HashMap<&str, usize> = mapping
        .sites
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let mut hits = vec![0u32; mapping.total_reads];
    let mut missing = Vec::new();
    for guide in guides {
        match index.get(guide.as_str()) {
            Some(&site) => {
                for &r in &mapping.reads[site] {
                    hits[r] += 1;
                }
            }
            None => missing.push(guide.clone()),
        }
    }

    Tally {
        guides: guides.len(),
        reads_hit: hits.iter().filter(|&&h| h > 0).count(),
        total_hits: hits.iter().map(|&h| h as usize).sum(),
        total_reads: mapping.total_reads,
        missing,
    }
}
