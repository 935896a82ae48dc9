//! Sample QC scoring (spec.md §4.3): the point-deduction table the Sample QC
//! stage worker runs over a sample's intake measurements.

use nanopore_domain::{QcIssue, QcMetrics, QcResult, QcSeverity, SampleQcInputs};

/// QC passes if no critical issue fired and the score is at least this.
const PASS_THRESHOLD: u8 = 70;

/// Score a sample's QC inputs against the spec's reference thresholds.
///
/// `sample_type` is always present on `Sample` (it's a required enum, not an
/// `Option`), so the table's "sample_type missing" critical-fail row can
/// never fire in this implementation — it exists in the spec for extractors
/// that model sample type as optional at intake.
#[must_use]
pub fn score_sample_qc(inputs: &SampleQcInputs) -> QcResult {
    let mut issues = Vec::new();
    let mut critical = false;
    let mut score: i32 = 100;

    match inputs.concentration_ng_per_ul {
        None => {
            critical = true;
            issues.push(QcIssue {
                severity: QcSeverity::Critical,
                field: "concentration_ng_per_ul".into(),
                message: "concentration is missing".into(),
            });
        }
        Some(c) if c < 1.0 => {
            score -= 30;
            issues.push(QcIssue {
                severity: QcSeverity::High,
                field: "concentration_ng_per_ul".into(),
                message: format!("concentration {c} ng/uL is below 1 ng/uL"),
            });
        }
        Some(c) if c > 1000.0 => {
            score -= 15;
            issues.push(QcIssue {
                severity: QcSeverity::Medium,
                field: "concentration_ng_per_ul".into(),
                message: format!("concentration {c} ng/uL exceeds 1000 ng/uL"),
            });
        }
        Some(_) => {}
    }

    match inputs.volume_ul {
        None => {
            score -= 30;
            issues.push(QcIssue {
                severity: QcSeverity::High,
                field: "volume_ul".into(),
                message: "volume is missing".into(),
            });
        }
        Some(v) if v < 1.0 => {
            score -= 25;
            issues.push(QcIssue {
                severity: QcSeverity::High,
                field: "volume_ul".into(),
                message: format!("volume {v} uL is below 1 uL"),
            });
        }
        Some(v) if v > 100.0 => {
            score -= 5;
            issues.push(QcIssue {
                severity: QcSeverity::Low,
                field: "volume_ul".into(),
                message: format!("volume {v} uL exceeds 100 uL"),
            });
        }
        Some(_) => {}
    }

    let total_amount_ng = inputs.total_amount_ng();
    if let Some(total) = total_amount_ng {
        if total < 50.0 {
            score -= 20;
            issues.push(QcIssue {
                severity: QcSeverity::Medium,
                field: "total_amount_ng".into(),
                message: format!("total amount {total} ng is below 50 ng"),
            });
        }
    }

    let score = score.clamp(0, 100) as u8;
    let passed = !critical && score >= PASS_THRESHOLD;

    let recommendations = recommendations_for(&issues);

    QcResult {
        passed,
        score,
        metrics: QcMetrics {
            concentration_ng_per_ul: inputs.concentration_ng_per_ul,
            volume_ul: inputs.volume_ul,
            total_amount_ng,
        },
        issues,
        recommendations,
    }
}

fn recommendations_for(issues: &[QcIssue]) -> Vec<String> {
    issues
        .iter()
        .filter_map(|issue| match issue.field.as_str() {
            "concentration_ng_per_ul" => Some("re-quantify with Qubit and re-submit".to_string()),
            "volume_ul" => Some("confirm remaining sample volume before proceeding".to_string()),
            "total_amount_ng" => Some("consider concentrating the sample prior to library prep".to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(concentration: Option<f64>, volume: Option<f64>) -> SampleQcInputs {
        SampleQcInputs {
            concentration_ng_per_ul: concentration,
            volume_ul: volume,
            ..Default::default()
        }
    }

    #[test]
    fn clean_sample_passes_with_perfect_score() {
        let result = score_sample_qc(&inputs(Some(50.0), Some(20.0)));
        assert!(result.passed);
        assert_eq!(result.score, 100);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn missing_concentration_is_critical_and_fails_regardless_of_score() {
        let result = score_sample_qc(&inputs(None, Some(20.0)));
        assert!(!result.passed);
        assert!(result
            .issues
            .iter()
            .any(|i| i.severity == QcSeverity::Critical));
    }

    #[test]
    fn low_concentration_deducts_thirty_points() {
        let result = score_sample_qc(&inputs(Some(0.5), Some(20.0)));
        assert_eq!(result.score, 70);
        assert!(result.passed);
    }

    #[test]
    fn very_low_concentration_and_low_total_amount_fails_on_score() {
        // concentration=0.5 (-30), total_amount = 0.5*20=10 < 50 (-20) => 50
        let result = score_sample_qc(&inputs(Some(0.5), Some(20.0)));
        let total = result.metrics.total_amount_ng.unwrap();
        assert!(total < 50.0);
        assert_eq!(result.score, 70 - 20);
        assert!(!result.passed);
    }

    #[test]
    fn missing_volume_deducts_thirty_points_and_has_no_total_amount() {
        let result = score_sample_qc(&inputs(Some(50.0), None));
        assert_eq!(result.score, 70);
        assert!(result.metrics.total_amount_ng.is_none());
    }

    #[test]
    fn score_never_drops_below_zero() {
        let result = score_sample_qc(&inputs(None, None));
        assert_eq!(result.score, 100 - 30); // only volume-missing deducts; concentration-missing is critical with no point penalty
        assert!(!result.passed);
    }

    #[test]
    fn high_concentration_and_high_volume_both_apply_lighter_penalties() {
        let result = score_sample_qc(&inputs(Some(1500.0), Some(150.0)));
        assert_eq!(result.score, 100 - 15 - 5);
        assert!(result.passed);
    }
}
