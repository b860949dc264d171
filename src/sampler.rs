use crate::error::{GuideCoverError, Result};
use crate::mapping::SiteMapping;
use crate::selector::Selection;
use bio::io::fasta;
use log::info;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;

/// A forward-only stream of read sequences.
pub trait SequenceSource {
    fn next_sequence(&mut self) -> Option<io::Result<Vec<u8>>>;
}

impl<B: BufRead> SequenceSource for fasta::Records<B> {
    fn next_sequence(&mut self) -> Option<io::Result<Vec<u8>>> {
        self.next().map(|r| r.map(|record| record.seq().to_vec()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Read index carried by the first record of the sequence file.
    /// FASTA files that open with a `>` comment line are numbered from 1.
    pub first_record_index: usize,
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            first_record_index: 1,
            seed: None,
        }
    }
}

/// Pick one read uniformly at random for each selected site.
/// Sites that hit no reads get `None`.
pub fn sample_reads<R: Rng>(mapping: &SiteMapping, picks: &[Selection], rng: &mut R) -> Vec<Option<usize>> {
    picks
        .iter()
        .map(|p| mapping.reads[p.site].choose(rng).copied())
        .collect()
}

/// Collect the sequences of `targets` in a single pass over `source`.
pub fn fetch_sequences<S: SequenceSource>(
    source: &mut S,
    targets: &[usize],
    first_record_index: usize,
) -> Result<HashMap<usize, Vec<u8>>> {
    let mut sorted = targets.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut found = HashMap::with_capacity(sorted.len());
    let Some(&first) = sorted.first() else {
        return Ok(found);
    };
    if first < first_record_index {
        return Err(GuideCoverError::SequenceNotFound { index: first });
    }

    let mut next = 0;
    let mut idx = first_record_index;
    while let Some(seq) = source.next_sequence() {
        let seq = seq.map_err(GuideCoverError::SourceReadError)?;
        if idx == sorted[next] {
            found.insert(idx, seq);
            next += 1;
            if next == sorted.len() {
                return Ok(found);
            }
        }
        idx += 1;
    }
    Err(GuideCoverError::SequenceNotFound { index: sorted[next] })
}

/// Pick a representative read per site and pull its sequence from `reads_path`.
pub fn representative_reads(
    mapping: &SiteMapping,
    picks: &[Selection],
    reads_path: &Path,
    config: SamplerConfig,
) -> Result<Vec<Option<String>>> {
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let sampled = sample_reads(mapping, picks, &mut rng);
    let targets: Vec<usize> = sampled.iter().flatten().copied().collect();

    info!(
        "Looking up {} representative reads in {}",
        targets.len(),
        reads_path.display()
    );
    let reader = crate::io::open(reads_path).map_err(GuideCoverError::SourceReadError)?;
    let mut records = fasta::Reader::from_bufread(reader).records();
    let found = fetch_sequences(&mut records, &targets, config.first_record_index)?;

    Ok(sampled
        .iter()
        .map(|read| {
            read.and_then(|r| found.get(&r))
                .map(|seq| String::from_utf8_lossy(seq).into_owned())
        })
        .collect())
}
