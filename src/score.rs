//! Check a chosen guide list against a FASTA file of reads.
//!
//! Each guide is extended with every sequence its PAM pattern allows, and a
//! read counts as a hit when any extended guide, or its reverse complement,
//! occurs in it.

use crate::error::{GuideCoverError, Result};
use bio::io::fasta;
use log::info;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const BATCH_SIZE: usize = 10_000;

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| match b {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        _ => b'N',
    }).collect()
}

/// Bases allowed by an IUPAC nucleotide code.
fn iupac_bases(code: u8) -> Option<&'static [u8]> {
    let bases: &'static [u8] = match code.to_ascii_uppercase() {
        b'A' => b"A",
        b'C' => b"C",
        b'G' => b"G",
        b'T' | b'U' => b"T",
        b'R' => b"AG",
        b'Y' => b"CT",
        b'S' => b"CG",
        b'W' => b"AT",
        b'K' => b"GT",
        b'M' => b"AC",
        b'B' => b"CGT",
        b'D' => b"AGT",
        b'H' => b"ACT",
        b'V' => b"ACG",
        b'N' => b"ACGT",
        _ => return None,
    };
    Some(bases)
}

/// Every concrete guide+PAM sequence, e.g. `NGG` gives four.
pub fn expand_pam(guide: &[u8], pam: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut out = vec![guide.to_ascii_uppercase()];
    for &code in pam {
        let bases = iupac_bases(code).ok_or_else(|| {
            GuideCoverError::InvalidParameter(format!("unknown PAM base {:?}", code as char))
        })?;
        out = out
            .iter()
            .flat_map(|prefix| {
                bases.iter().map(move |&b| {
                    let mut seq = prefix.clone();
                    seq.push(b);
                    seq
                })
            })
            .collect();
    }
    Ok(out)
}

pub struct GuideMatcher {
    patterns: Vec<Vec<u8>>,
}

impl GuideMatcher {
    pub fn new(guides: &[String], pam: &str) -> Result<Self> {
        let mut patterns = Vec::new();
        for guide in guides {
            for seq in expand_pam(guide.as_bytes(), pam.as_bytes())? {
                patterns.push(reverse_complement(&seq));
                patterns.push(seq);
            }
        }
        patterns.sort_unstable();
        patterns.dedup();
        Ok(GuideMatcher { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn hits(&self, read: &[u8]) -> bool {
        let read = read.to_ascii_uppercase();
        self.patterns
            .iter()
            .any(|p| !p.is_empty() && read.windows(p.len()).any(|w| w == p.as_slice()))
    }
}

/// Where classified reads go.
pub trait ReadTally {
    fn record_hit(&mut self, record: &fasta::Record) -> Result<()>;
    fn record_miss(&mut self, record: &fasta::Record) -> Result<()>;
    fn hits(&self) -> usize;
    fn total(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct HitCounts {
    hits: usize,
    misses: usize,
}

impl ReadTally for HitCounts {
    fn record_hit(&mut self, _record: &fasta::Record) -> Result<()> {
        self.hits += 1;
        Ok(())
    }

    fn record_miss(&mut self, _record: &fasta::Record) -> Result<()> {
        self.misses += 1;
        Ok(())
    }

    fn hits(&self) -> usize {
        self.hits
    }

    fn total(&self) -> usize {
        self.hits + self.misses
    }
}

/// Counts reads and also writes hits and misses to two FASTA files.
pub struct SplitReads<W: Write> {
    counts: HitCounts,
    dashed: fasta::Writer<W>,
    undashed: fasta::Writer<W>,
}

impl<W: Write> SplitReads<W> {
    pub fn new(dashed: W, undashed: W) -> Self {
        SplitReads {
            counts: HitCounts::default(),
            dashed: fasta::Writer::new(dashed),
            undashed: fasta::Writer::new(undashed),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.dashed.flush()?;
        self.undashed.flush()
    }
}

impl<W: Write> ReadTally for SplitReads<W> {
    fn record_hit(&mut self, record: &fasta::Record) -> Result<()> {
        self.counts.record_hit(record)?;
        self.dashed.write_record(record)?;
        Ok(())
    }

    fn record_miss(&mut self, record: &fasta::Record) -> Result<()> {
        self.counts.record_miss(record)?;
        self.undashed.write_record(record)?;
        Ok(())
    }

    fn hits(&self) -> usize {
        self.counts.hits()
    }

    fn total(&self) -> usize {
        self.counts.total()
    }
}

/// Classify every record, in input order.
pub fn classify<B: BufRead, T: ReadTally>(
    records: fasta::Records<B>,
    matcher: &GuideMatcher,
    tally: &mut T,
) -> Result<()> {
    let mut batch: Vec<fasta::Record> = Vec::with_capacity(BATCH_SIZE);
    let mut records = records.peekable();
    while records.peek().is_some() {
        batch.clear();
        for record in records.by_ref().take(BATCH_SIZE) {
            batch.push(record.map_err(GuideCoverError::SourceReadError)?);
        }

        let flags: Vec<bool> = batch.par_iter().map(|r| matcher.hits(r.seq())).collect();
        for (record, hit) in batch.iter().zip(flags) {
            if hit {
                tally.record_hit(record)?;
            } else {
                tally.record_miss(record)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub pam: String,
    /// Reject guides of any other length.
    pub guide_length: Option<usize>,
    /// Directory for `<stem>_dashed.fasta` and `<stem>_undashed.fasta`; no split when `None`.
    pub split_dir: Option<PathBuf>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        ScoreConfig {
            pam: "NGG".to_string(),
            guide_length: Some(20),
            split_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub guides: usize,
    pub hits: usize,
    pub total: usize,
}

impl ScoreSummary {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / self.total as f64
        }
    }
}

pub fn load_guides(path: &Path, guide_length: Option<usize>) -> Result<Vec<String>> {
    let guides = crate::report::read_sites(crate::io::open(path)?)?;
    if let Some(len) = guide_length {
        for (i, g) in guides.iter().enumerate() {
            if g.len() != len {
                return Err(GuideCoverError::malformed(
                    i + 2,
                    format!("expected a {}-mer guide, got {}", len, g),
                ));
            }
        }
    }
    Ok(guides)
}

fn split_paths(reads: &Path, dir: &Path) -> (PathBuf, PathBuf) {
    let stem = reads
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reads".to_string());
    (
        dir.join(format!("{}_dashed.fasta", stem)),
        dir.join(format!("{}_undashed.fasta", stem)),
    )
}

pub fn score_reads(guides_path: &Path, reads_path: &Path, config: &ScoreConfig) -> Result<ScoreSummary> {
    let guides = load_guides(guides_path, config.guide_length)?;
    let matcher = GuideMatcher::new(&guides, &config.pam)?;
    info!(
        "Scoring {} guides ({} patterns with PAM {}) against {}",
        guides.len(),
        matcher.len(),
        config.pam,
        reads_path.display()
    );

    let started = Instant::now();
    let reader = crate::io::open(reads_path).map_err(GuideCoverError::SourceReadError)?;
    let records = fasta::Reader::from_bufread(reader).records();

    let (hits, total) = match &config.split_dir {
        Some(dir) => {
            let (dashed_path, undashed_path) = split_paths(reads_path, dir);
            let mut split = SplitReads::new(File::create(&dashed_path)?, File::create(&undashed_path)?);
            classify(records, &matcher, &mut split)?;
            split.flush()?;
            info!("Wrote {}", dashed_path.display());
            info!("Wrote {}", undashed_path.display());
            (split.hits(), split.total())
        }
        None => {
            let mut counts = HitCounts::default();
            classify(records, &matcher, &mut counts)?;
            (counts.hits(), counts.total())
        }
    };
    info!("Parsing FASTA took {:?}", started.elapsed());

    Ok(ScoreSummary {
        guides: guides.len(),
        hits,
        total,
    })
}
