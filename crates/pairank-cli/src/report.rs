//! CSV result tables.
//!
//! Two files, one row per (trial, estimator), in [`Estimator::ALL`] order:
//!
//! - `ranks.csv`: top-k agreement as `1`/`0`, one column per `k`.
//! - `errors.csv`: relative entrywise error.
//!
//! Text cells are quoted, numbers are not. A failed estimator writes
//! `"failed"` in every value cell. Agreement columns past `n` hold the empty
//! string, which the quoting rule writes as `""`; readers should treat `""`
//! as "no value".

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{QuoteStyle, Writer, WriterBuilder};
use pairank_core::estimate::Estimator;
use pairank_core::trial::{AlgorithmOutcome, TrialReport};

pub const RANKS_FILE: &str = "ranks.csv";
pub const ERRORS_FILE: &str = "errors.csv";
pub const FAILED: &str = "failed";

const KEY_COLUMNS: [&str; 5] = ["model", "algorithm", "items", "epsilon", "comparisons"];

#[must_use]
pub fn ranks_header(depth: usize) -> Vec<String> {
    KEY_COLUMNS
        .iter()
        .map(ToString::to_string)
        .chain((1..=depth).map(|k| format!("top_{k}")))
        .collect()
}

#[must_use]
pub fn errors_header() -> Vec<String> {
    KEY_COLUMNS
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once("error".to_string()))
        .collect()
}

fn key_cells(report: &TrialReport, estimator: Estimator) -> Vec<String> {
    vec![
        estimator.model().as_str().to_string(),
        estimator.algorithm().to_string(),
        report.params.items.to_string(),
        report.params.epsilon.to_string(),
        report.params.comparisons.to_string(),
    ]
}

/// `ranks.csv` rows for one trial.
#[must_use]
pub fn rank_rows(report: &TrialReport, depth: usize) -> Vec<Vec<String>> {
    report
        .algorithms
        .iter()
        .map(|algo| {
            let mut row = key_cells(report, algo.estimator);
            match &algo.outcome {
                AlgorithmOutcome::Completed(eval) => {
                    row.extend((0..depth).map(|k| {
                        eval.agreement
                            .get(k)
                            .map_or_else(String::new, |&hit| u8::from(hit).to_string())
                    }));
                }
                AlgorithmOutcome::Failed { .. } => {
                    row.extend(std::iter::repeat_n(FAILED.to_string(), depth));
                }
            }
            row
        })
        .collect()
}

/// `errors.csv` rows for one trial.
#[must_use]
pub fn error_rows(report: &TrialReport) -> Vec<Vec<String>> {
    report
        .algorithms
        .iter()
        .map(|algo| {
            let mut row = key_cells(report, algo.estimator);
            row.push(match &algo.outcome {
                AlgorithmOutcome::Completed(eval) => eval.error.to_string(),
                AlgorithmOutcome::Failed { .. } => FAILED.to_string(),
            });
            row
        })
        .collect()
}

/// Appends trial rows to `ranks.csv` and `errors.csv` in one directory.
pub struct ResultWriter {
    ranks: Writer<File>,
    errors: Writer<File>,
    depth: usize,
    dir: PathBuf,
}

impl ResultWriter {
    /// Create (truncating) both files and write their headers.
    pub fn create(dir: &Path, depth: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let mut ranks = open(&dir.join(RANKS_FILE))?;
        let mut errors = open(&dir.join(ERRORS_FILE))?;
        ranks.write_record(ranks_header(depth))?;
        errors.write_record(errors_header())?;
        Ok(Self {
            ranks,
            errors,
            depth,
            dir: dir.to_path_buf(),
        })
    }

    pub fn write_trial(&mut self, report: &TrialReport) -> Result<()> {
        for row in rank_rows(report, self.depth) {
            self.ranks.write_record(&row)?;
        }
        for row in error_rows(report) {
            self.errors.write_record(&row)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.ranks
            .flush()
            .with_context(|| format!("Failed to write {RANKS_FILE}"))?;
        self.errors
            .flush()
            .with_context(|| format!("Failed to write {ERRORS_FILE}"))?;
        Ok(self.dir)
    }
}

fn open(path: &Path) -> Result<Writer<File>> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairank_core::ErrorCode;
    use pairank_core::evaluate::Evaluation;
    use pairank_core::trial::{AlgorithmReport, TrialParams};

    fn report() -> TrialReport {
        let completed = |estimator| AlgorithmReport {
            estimator,
            outcome: AlgorithmOutcome::Completed(Evaluation {
                estimator,
                estimate: vec![0.2, 0.5, 0.3],
                error: 0.25,
                ranking: vec![1, 2, 0],
                agreement: vec![true, false, true],
            }),
        };
        TrialReport {
            params: TrialParams::new(3, 50, 0.2),
            truth: vec![0.2, 0.5, 0.3],
            truth_ranking: vec![1, 2, 0],
            edges: 3,
            dropped_edge: true,
            algorithms: vec![
                completed(Estimator::BtlLp),
                completed(Estimator::ThurstoneLp),
                AlgorithmReport {
                    estimator: Estimator::Spectral,
                    outcome: AlgorithmOutcome::Failed {
                        code: ErrorCode::ConvergenceFailure,
                        message: "disconnected".into(),
                    },
                },
                completed(Estimator::Mle),
            ],
        }
    }

    #[test]
    fn headers_match_table_layout() {
        let header = ranks_header(20);
        assert_eq!(header.len(), 25);
        assert_eq!(header[..5], KEY_COLUMNS);
        assert_eq!(header[5], "top_1");
        assert_eq!(header[24], "top_20");
        assert_eq!(
            errors_header(),
            vec![
                "model",
                "algorithm",
                "items",
                "epsilon",
                "comparisons",
                "error",
            ]
        );
    }

    #[test]
    fn rows_follow_estimator_order() {
        let rows = rank_rows(&report(), 5);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r[0].as_str(), r[1].as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("btl", "lp"),
                ("thu", "lp"),
                ("btl", "spec"),
                ("btl", "mle"),
            ]
        );
        assert_eq!(rows[0][2..5], ["3", "0.2", "50"]);
    }

    #[test]
    fn agreement_past_n_is_empty() {
        let rows = rank_rows(&report(), 5);
        assert_eq!(rows[0][5..], ["1", "0", "1", "", ""]);
    }

    #[test]
    fn failed_estimator_fills_every_value_cell() {
        let rows = rank_rows(&report(), 5);
        assert!(rows[2][5..].iter().all(|c| c == FAILED));
        let errors = error_rows(&report());
        assert_eq!(errors[2][5], FAILED);
        assert_eq!(errors[0][5], "0.25");
    }

    #[test]
    fn writer_quotes_text_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = ResultWriter::create(dir.path(), 3).expect("create");
        writer.write_trial(&report()).expect("write");
        writer.finish().expect("flush");

        let ranks = std::fs::read_to_string(dir.path().join(RANKS_FILE)).expect("read");
        let mut lines = ranks.lines();
        assert_eq!(
            lines.next(),
            Some(r#""model","algorithm","items","epsilon","comparisons","top_1","top_2","top_3""#)
        );
        assert_eq!(lines.next(), Some(r#""btl","lp",3,0.2,50,1,0,1"#));
        assert_eq!(lines.count(), 3);

        let errors = std::fs::read_to_string(dir.path().join(ERRORS_FILE)).expect("read");
        assert!(errors.contains(r#""btl","spec",3,0.2,50,"failed""#));
    }

    #[test]
    fn columns_past_item_count_are_quoted_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = ResultWriter::create(dir.path(), 5).expect("create");
        writer.write_trial(&report()).expect("write");
        writer.finish().expect("flush");

        let ranks = std::fs::read_to_string(dir.path().join(RANKS_FILE)).expect("read");
        let rows: Vec<&str> = ranks.lines().skip(1).collect();
        assert_eq!(rows[0], r#""btl","lp",3,0.2,50,1,0,1,"","""#);
        assert_eq!(
            rows[2],
            r#""btl","spec",3,0.2,50,"failed","failed","failed","failed","failed""#
        );

        let mut reader = csv::Reader::from_path(dir.path().join(RANKS_FILE)).expect("open");
        let first = reader.records().next().expect("row").expect("parse");
        assert_eq!(first.len(), 10);
        assert_eq!(&first[7], "1");
        assert_eq!(&first[8], "");
        assert_eq!(&first[9], "");
    }
}
