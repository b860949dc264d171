//! Greedy maximum coverage over the sites-to-reads mapping.
//!
//! Each round takes the available site hitting the most reads that are still
//! below the coverage threshold. Ties go to the site loaded first. A taken
//! site is never considered again.

use crate::coverage::CoverageTracker;
use crate::error::{GuideCoverError, Result};
use crate::mapping::SiteMapping;
use log::{debug, info};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Which reads a selection is credited with in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountingPolicy {
    /// Reads hit for the first time by this site.
    #[default]
    FirstTouch,
    /// Reads whose hit count reaches the threshold with this site.
    ThresholdCrossing,
}

/// How the best remaining site is found each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ranking {
    /// Recount every available site after each pick.
    #[default]
    Rescan,
    /// Max-heap of stale upper bounds, recounted only when they reach the top.
    Lazy,
}

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub max_guides: usize,
    pub threshold: u32,
    pub counting: CountingPolicy,
    pub ranking: Ranking,
    /// Log progress every this many picks; 0 disables it.
    pub progress_every: usize,
}

impl SelectorConfig {
    pub fn new(max_guides: usize, threshold: u32) -> Self {
        SelectorConfig {
            max_guides,
            threshold,
            counting: CountingPolicy::default(),
            ranking: Ranking::default(),
            progress_every: 20,
        }
    }

    fn validate(&self, available: usize) -> Result<()> {
        if self.max_guides == 0 {
            return Err(GuideCoverError::InvalidParameter(
                "number of guides must be positive".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(GuideCoverError::InvalidParameter(
                "coverage threshold must be positive".to_string(),
            ));
        }
        if self.max_guides > available {
            return Err(GuideCoverError::InsufficientGuides {
                requested: self.max_guides,
                available,
            });
        }
        Ok(())
    }
}

/// One chosen site, in the order it was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub site: usize,
    /// Reads below the threshold when the site was taken (its ranking count).
    pub gain: usize,
    /// Reads credited to this site under the configured `CountingPolicy`.
    pub newly_covered: usize,
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub picks: Vec<Selection>,
    pub tracker: CoverageTracker,
    pub counting: CountingPolicy,
}

impl SelectionResult {
    pub fn sites(&self) -> Vec<usize> {
        self.picks.iter().map(|p| p.site).collect()
    }

    /// Running total of `newly_covered`.
    pub fn cumulative(&self) -> Vec<usize> {
        self.picks
            .iter()
            .scan(0, |acc, p| {
                *acc += p.newly_covered;
                Some(*acc)
            })
            .collect()
    }

    pub fn total_covered(&self) -> usize {
        self.picks.iter().map(|p| p.newly_covered).sum()
    }

    pub fn total_reads(&self) -> usize {
        self.tracker.total_reads()
    }
}

pub struct GreedySelector<'a> {
    reads: &'a [Vec<usize>],
    tracker: CoverageTracker,
    available: Vec<bool>,
    config: SelectorConfig,
    counts: Vec<Option<usize>>,
    heap: BinaryHeap<(usize, Reverse<usize>)>,
}

impl<'a> GreedySelector<'a> {
    pub fn new(mapping: &'a SiteMapping, config: SelectorConfig) -> Result<Self> {
        config.validate(mapping.len())?;

        let tracker = CoverageTracker::new(mapping.total_reads, config.threshold);
        let available = vec![true; mapping.len()];
        let mut counts = vec![None; mapping.len()];
        let mut heap = BinaryHeap::new();

        match config.ranking {
            Ranking::Rescan => tracker.rank_all(&mapping.reads, &available, &mut counts),
            Ranking::Lazy => {
                heap.reserve(mapping.len());
                for (idx, reads) in mapping.reads.iter().enumerate() {
                    heap.push((tracker.under_covered(reads), Reverse(idx)));
                }
            }
        }

        Ok(GreedySelector {
            reads: &mapping.reads,
            tracker,
            available,
            config,
            counts,
            heap,
        })
    }

    fn best_rescan(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, count) in self.counts.iter().enumerate() {
            if let Some(count) = *count {
                if best.map_or(true, |(_, b)| count > b) {
                    best = Some((idx, count));
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    // Counts only shrink, so a heap entry is an upper bound. When the top entry
    // is still exact no other site can beat it, and ties resolve to the lower
    // index through the `Reverse` key.
    fn best_lazy(&mut self) -> Option<usize> {
        while let Some((bound, Reverse(idx))) = self.heap.pop() {
            if !self.available[idx] {
                continue;
            }
            let count = self.tracker.under_covered(&self.reads[idx]);
            if count == bound {
                return Some(idx);
            }
            self.heap.push((count, Reverse(idx)));
        }
        None
    }

    /// Take the next best site.
    pub fn step(&mut self) -> Option<Selection> {
        let site = match self.config.ranking {
            Ranking::Rescan => self.best_rescan(),
            Ranking::Lazy => self.best_lazy(),
        }?;

        self.available[site] = false;
        let reg = self.tracker.register(&self.reads[site]);
        let newly_covered = match self.config.counting {
            CountingPolicy::FirstTouch => reg.first_touched,
            CountingPolicy::ThresholdCrossing => reg.satisfied,
        };

        if self.config.ranking == Ranking::Rescan {
            self.tracker.rank_all(self.reads, &self.available, &mut self.counts);
        }

        Some(Selection {
            site,
            gain: reg.under_covered,
            newly_covered,
        })
    }

    /// Run all rounds.
    pub fn run(mut self) -> Result<SelectionResult> {
        let mut picks = Vec::with_capacity(self.config.max_guides);
        for i in 0..self.config.max_guides {
            let pick = self.step().ok_or(GuideCoverError::InsufficientGuides {
                requested: self.config.max_guides,
                available: i,
            })?;
            debug!(
                "Pick {}: site {} gains {} under-covered reads",
                i + 1,
                pick.site,
                pick.gain
            );
            picks.push(pick);

            if self.config.progress_every > 0 && i % self.config.progress_every == 0 {
                info!("Found {} guides...", i + 1);
            }
        }

        Ok(SelectionResult {
            picks,
            tracker: self.tracker,
            counting: self.config.counting,
        })
    }
}

pub fn select_guides(mapping: &SiteMapping, config: SelectorConfig) -> Result<SelectionResult> {
    GreedySelector::new(mapping, config)?.run()
}
