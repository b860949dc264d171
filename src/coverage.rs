/// How many selected sites hit each read so far.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    counts: Vec<u32>,
    threshold: u32,
}

impl CoverageTracker {
    /// Every read starts uncovered. `threshold` must be positive.
    pub fn new(total_reads: usize, threshold: u32) -> Self {
        debug_assert!(threshold > 0);
        CoverageTracker {
            counts: vec![0; total_reads],
            threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn total_reads(&self) -> usize {
        self.counts.len()
    }

    pub fn coverage(&self, read: usize) -> u32 {
        self.counts[read]
    }

    pub fn is_satisfied(&self, read: usize) -> bool {
        self.counts[read] >= self.threshold
    }

    /// Number of `reads` still below the threshold.
    pub fn under_covered(&self, reads: &[usize]) -> usize {
        reads.iter().filter(|&&r| self.counts[r] < self.threshold).count()
    }

    /// Recompute the ranking count of every still-available site.
    /// Consumed sites are left as `None`.
    pub fn rank_all(&self, reads: &[Vec<usize>], available: &[bool], counts: &mut [Option<usize>]) {
        for (idx, site_reads) in reads.iter().enumerate() {
            counts[idx] = if available[idx] {
                Some(self.under_covered(site_reads))
            } else {
                None
            };
        }
    }

    /// Add one hit to every read of a selected site, including reads already
    /// at or above the threshold.
    pub fn register(&mut self, reads: &[usize]) -> Registration {
        let mut reg = Registration::default();
        for &r in reads {
            let before = self.counts[r];
            if before < self.threshold {
                reg.under_covered += 1;
            }
            if before == 0 {
                reg.first_touched += 1;
            }
            if before + 1 == self.threshold {
                reg.satisfied += 1;
            }
            self.counts[r] = before + 1;
        }
        reg
    }

    /// Reads hit by at least one selected site.
    pub fn touched(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Reads hit by at least `threshold` selected sites.
    pub fn satisfied(&self) -> usize {
        self.counts.iter().filter(|&&c| c >= self.threshold).count()
    }
}

/// What one selection did to the read counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registration {
    /// Reads below the threshold just before the selection.
    pub under_covered: usize,
    /// Reads going from zero to one hit.
    pub first_touched: usize,
    /// Reads reaching the threshold with this selection.
    pub satisfied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_counts() {
        let mut t = CoverageTracker::new(5, 2);
        let reg = t.register(&[1, 2, 3]);
        assert_eq!(
            reg,
            Registration {
                under_covered: 3,
                first_touched: 3,
                satisfied: 0
            }
        );

        let reg = t.register(&[3, 4]);
        assert_eq!(
            reg,
            Registration {
                under_covered: 2,
                first_touched: 1,
                satisfied: 1
            }
        );
        assert_eq!(t.coverage(3), 2);
        assert!(t.is_satisfied(3));
        assert!(!t.is_satisfied(4));
        assert_eq!(t.touched(), 4);
        assert_eq!(t.satisfied(), 1);
    }

    #[test]
    fn test_over_coverage_still_counted() {
        let mut t = CoverageTracker::new(2, 1);
        t.register(&[0]);
        let reg = t.register(&[0]);
        assert_eq!(reg, Registration::default());
        assert_eq!(t.coverage(0), 2);
    }

    #[test]
    fn test_rank_all_skips_consumed() {
        let mut t = CoverageTracker::new(5, 1);
        let reads = vec![vec![1, 2, 3], vec![3, 4], vec![1]];
        let mut counts = vec![None; 3];
        t.rank_all(&reads, &[true, true, true], &mut counts);
        assert_eq!(counts, vec![Some(3), Some(2), Some(1)]);

        t.register(&reads[0]);
        t.rank_all(&reads, &[false, true, true], &mut counts);
        assert_eq!(counts, vec![None, Some(1), Some(0)]);
    }
}
