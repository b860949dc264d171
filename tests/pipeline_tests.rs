extern crate guidecover;

use guidecover::mapping::{load_mapping, HeaderPolicy, LoadOptions};
use guidecover::report;
use guidecover::sampler::{representative_reads, SamplerConfig};
use guidecover::score::{score_reads, ScoreConfig};
use guidecover::selector::{select_guides, CountingPolicy, Ranking, SelectorConfig};
use guidecover::tally::tally;
use guidecover::GuideCoverError;
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn required() -> LoadOptions {
    LoadOptions {
        header: HeaderPolicy::Required,
    }
}

#[test]
fn test_optimize_report() {
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    assert_eq!(mapping.len(), 5);
    assert_eq!(mapping.total_reads, 8);
    // "1 2 3 3" and "5 6 7 5" collapse to three reads each.
    assert_eq!(mapping.reads[0], vec![1, 2, 3]);
    assert_eq!(mapping.reads[3], vec![5, 6, 7]);

    let result = select_guides(&mapping, SelectorConfig::new(3, 1)).unwrap();
    assert_eq!(result.sites(), vec![0, 3, 1]);

    let mut out = Vec::new();
    report::write_report(&mut out, &mapping, &result, None).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], report::HEADER);
    assert_eq!(lines[1], "GATTACAGATTACAGATTAC, 0, 3, 3");
    assert_eq!(lines[2], "ACGTTGCAACGTTGCAACGT, 3, 3, 6");
    assert_eq!(lines[3], "CCCCGGGGAAAATTTTACGT, 1, 1, 7");
    assert_eq!(lines.len(), 4);
    assert_eq!(report::summary(&result), "3 sites covered 7 reads, # reads: 8");
}

#[test]
fn test_lazy_ranking_same_report() {
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    for threshold in 1..=3 {
        let mut lazy = SelectorConfig::new(5, threshold);
        lazy.ranking = Ranking::Lazy;
        let a = select_guides(&mapping, SelectorConfig::new(5, threshold)).unwrap();
        let b = select_guides(&mapping, lazy).unwrap();
        assert_eq!(a.picks, b.picks);
    }
}

#[test]
fn test_threshold_counting_in_report() {
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    let mut config = SelectorConfig::new(5, 2);
    config.counting = CountingPolicy::ThresholdCrossing;
    let result = select_guides(&mapping, config).unwrap();

    let cumulative = result.cumulative();
    assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
    // Reads 1, 3 and 7 are each hit by two sites.
    assert_eq!(*cumulative.last().unwrap(), 3);
}

#[test]
fn test_representative_reads() {
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    let result = select_guides(&mapping, SelectorConfig::new(5, 1)).unwrap();
    assert_eq!(result.sites(), vec![0, 3, 1, 2, 4]);

    let config = SamplerConfig {
        first_record_index: 1,
        seed: Some(42),
    };
    let seqs = representative_reads(&mapping, &result.picks, &data("reads.fasta"), config).unwrap();
    assert_eq!(seqs.len(), 5);
    assert!(seqs.iter().all(Option::is_some));
    // Sites 2 and 4 each hit a single read.
    assert_eq!(seqs[3].as_deref(), Some("AAAGATTACAGATTACAGATTACTGGAAA"));
    assert_eq!(seqs[4].as_deref(), Some("ACGTACGT"));

    let mut out = Vec::new();
    report::write_report(&mut out, &mapping, &result, Some(seqs.as_slice())).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(&format!("{}, {}\n", report::HEADER, report::READ_COLUMN)));
    assert!(text.contains("GGGGCCCCTTTTAAAAGGCC, 4, 0, 7, ACGTACGT\n"));
}

#[test]
fn test_representative_read_outside_fasta() {
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    let result = select_guides(&mapping, SelectorConfig::new(5, 1)).unwrap();
    // Numbering from 4 puts read 1 before the first record.
    let config = SamplerConfig {
        first_record_index: 4,
        seed: Some(7),
    };
    let err = representative_reads(&mapping, &result.picks, &data("reads.fasta"), config).unwrap_err();
    assert!(matches!(err, GuideCoverError::SequenceNotFound { .. }));
}

#[test]
fn test_missing_header() {
    let err = load_mapping(&data("sites_no_header.txt"), required()).unwrap_err();
    assert!(matches!(err, GuideCoverError::MissingHeader));

    let mapping = load_mapping(&data("sites_no_header.txt"), LoadOptions::default()).unwrap();
    assert_eq!(mapping.total_reads, 5);
}

#[test]
fn test_insufficient_guides() {
    let mapping = load_mapping(&data("sites_no_header.txt"), LoadOptions::default()).unwrap();
    let err = select_guides(&mapping, SelectorConfig::new(10, 1)).unwrap_err();
    assert!(matches!(
        err,
        GuideCoverError::InsufficientGuides {
            requested: 10,
            available: 3
        }
    ));
}

#[test]
fn test_score_and_tally_report() {
    let dir = tempfile::tempdir().unwrap();
    let mapping = load_mapping(&data("sites_to_reads.txt"), required()).unwrap();
    let result = select_guides(&mapping, SelectorConfig::new(5, 1)).unwrap();

    let guides_path = dir.path().join("guides.csv");
    let file = std::fs::File::create(&guides_path).unwrap();
    report::write_report(file, &mapping, &result, None).unwrap();

    let config = ScoreConfig {
        split_dir: Some(dir.path().to_path_buf()),
        ..ScoreConfig::default()
    };
    let summary = score_reads(&guides_path, &data("reads.fasta"), &config).unwrap();
    assert_eq!(summary.guides, 5);
    assert_eq!(summary.hits, 3);
    assert_eq!(summary.total, 8);

    let dashed = std::fs::read_to_string(dir.path().join("reads_dashed.fasta")).unwrap();
    let undashed = std::fs::read_to_string(dir.path().join("reads_undashed.fasta")).unwrap();
    assert_eq!(dashed.matches('>').count(), 3);
    assert_eq!(undashed.matches('>').count(), 5);
    assert!(dashed.contains(">read3"));

    let guides = guidecover::score::load_guides(&guides_path, None).unwrap();
    let t = tally(&mapping, &guides[..2]);
    assert_eq!(t.reads_hit, 6);
    assert!(t.missing.is_empty());
}

#[test]
fn test_score_rejects_short_guides() {
    let dir = tempfile::tempdir().unwrap();
    let guides_path = dir.path().join("guides.csv");
    std::fs::write(&guides_path, format!("{}\nACGT, 0, 1, 1\n", report::HEADER)).unwrap();
    let err = score_reads(&guides_path, &data("reads.fasta"), &ScoreConfig::default()).unwrap_err();
    assert!(matches!(err, GuideCoverError::MalformedInput { line: 2, .. }));
}
