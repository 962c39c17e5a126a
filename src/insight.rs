//! Summary analysis
//!
//! This module derives advisory insight from a finished [`HealthSummary`]:
//! a wellness score, four threshold-based risk assessments, and plain-text
//! recommendations. The output is informational only and never feeds back
//! into aggregation or the response contract.

use serde::{Deserialize, Serialize};

use crate::aggregate::round_to_one_decimal;
use crate::types::HealthSummary;

/// Risk band for a single assessment or the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Traffic-light color the host UI renders the band with.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Medium => "orange",
            RiskLevel::High => "red",
        }
    }

    fn from_percentage(percentage: u32) -> Self {
        if percentage > 60 {
            RiskLevel::High
        } else if percentage > 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn from_average(average: f64) -> Self {
        if average < 30.0 {
            RiskLevel::Low
        } else if average < 60.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// One condition-specific risk estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Additive risk points, capped at 100
    pub risk_percentage: u32,
    pub level: RiskLevel,
}

impl RiskAssessment {
    fn new(risk_percentage: u32) -> Self {
        Self {
            risk_percentage,
            level: RiskLevel::from_percentage(risk_percentage),
        }
    }
}

/// The four condition-specific assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRisks {
    pub diabetes: RiskAssessment,
    pub cardiovascular: RiskAssessment,
    pub obesity: RiskAssessment,
    pub sleep_disorders: RiskAssessment,
}

/// Advisory report derived from one summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall wellness score, 0-100 with one decimal
    pub health_score: f64,
    /// Band for the mean of the four risk percentages
    pub risk_level: RiskLevel,
    pub risk_color: String,
    pub recommendations: Vec<String>,
    pub detailed_risks: DetailedRisks,
    /// The summary the report was derived from
    pub summary: HealthSummary,
}

/// Analyze a summary. Pure and total, like aggregation.
pub fn analyze(summary: &HealthSummary) -> HealthReport {
    let detailed_risks = DetailedRisks {
        diabetes: RiskAssessment::new(diabetes_risk(summary)),
        cardiovascular: RiskAssessment::new(cardiovascular_risk(summary)),
        obesity: RiskAssessment::new(obesity_risk(summary)),
        sleep_disorders: RiskAssessment::new(sleep_disorder_risk(summary)),
    };

    let average_risk = f64::from(
        detailed_risks.diabetes.risk_percentage
            + detailed_risks.cardiovascular.risk_percentage
            + detailed_risks.obesity.risk_percentage
            + detailed_risks.sleep_disorders.risk_percentage,
    ) / 4.0;
    let risk_level = RiskLevel::from_average(average_risk);

    HealthReport {
        health_score: health_score(summary),
        risk_level,
        risk_color: risk_level.color().to_string(),
        recommendations: recommendations(summary, &detailed_risks),
        detailed_risks,
        summary: summary.clone(),
    }
}

fn sleep_hours(summary: &HealthSummary) -> f64 {
    f64::from(summary.total_sleep_minutes) / 60.0
}

/// Mean of six per-metric scores, each clamped to [0, 1], scaled to 100.
///
/// The anchors: 10k steps, 8 hours of sleep, BMI 22, 70 bpm, 98% SpO2 and
/// the lowest stress band are each worth a full sub-score.
fn health_score(summary: &HealthSummary) -> f64 {
    let step_score = (f64::from(summary.step_count) / 10_000.0).min(1.0);
    let sleep_score = 1.0 - (8.0 - sleep_hours(summary)).abs() / 8.0;
    let bmi_score = 1.0 - (22.0 - summary.bmi).abs() / 15.0;
    let hr_score = 1.0 - (70.0 - f64::from(summary.heart_rate_bpm)).abs() / 50.0;
    let spo2_score = (f64::from(summary.spo2) / 98.0).min(1.0);
    let stress_score = 1.0 - (f64::from(summary.stress_level) - 1.0) / 9.0;

    let scores = [
        step_score,
        sleep_score,
        bmi_score,
        hr_score,
        spo2_score,
        stress_score,
    ];
    let total: f64 = scores.iter().map(|s| s.clamp(0.0, 1.0)).sum();

    round_to_one_decimal(total / scores.len() as f64 * 100.0)
}

fn diabetes_risk(summary: &HealthSummary) -> u32 {
    let mut points = 0;
    if summary.bmi > 30.0 {
        points += 40;
    } else if summary.bmi > 25.0 {
        points += 20;
    }
    if summary.step_count < 5_000 {
        points += 30;
    } else if summary.step_count < 8_000 {
        points += 15;
    }
    if summary.stress_level > 4 {
        points += 10;
    }
    points.min(100)
}

fn cardiovascular_risk(summary: &HealthSummary) -> u32 {
    let mut points = 0;
    if summary.heart_rate_bpm > 100 {
        points += 35;
    } else if summary.heart_rate_bpm > 85 {
        points += 20;
    }
    if summary.bmi > 30.0 {
        points += 25;
    } else if summary.bmi > 25.0 {
        points += 15;
    }
    if summary.stress_level > 4 {
        points += 10;
    }
    if summary.step_count < 5_000 {
        points += 15;
    }
    points.min(100)
}

fn obesity_risk(summary: &HealthSummary) -> u32 {
    let mut points = 0;
    if summary.bmi > 30.0 {
        points += 60;
    } else if summary.bmi > 25.0 {
        points += 30;
    }
    if summary.step_count < 5_000 {
        points += 25;
    } else if summary.step_count < 8_000 {
        points += 10;
    }
    if summary.calories > 3_000 {
        points += 15;
    }
    points.min(100)
}

fn sleep_disorder_risk(summary: &HealthSummary) -> u32 {
    let hours = sleep_hours(summary);
    let mut points = 0;
    if hours < 6.0 {
        points += 40;
    } else if hours < 7.0 {
        points += 20;
    } else if hours > 9.0 {
        points += 15;
    }
    if summary.stress_level > 4 {
        points += 15;
    }
    if summary.heart_rate_bpm > 85 {
        points += 15;
    }
    points.min(100)
}

fn recommendations(summary: &HealthSummary, risks: &DetailedRisks) -> Vec<String> {
    let mut out = Vec::new();

    if summary.step_count < 5_000 {
        out.push("Increase daily activity - aim for 10,000 steps per day".to_string());
    } else if summary.step_count < 8_000 {
        out.push("Good activity level - try to reach 10,000 steps daily".to_string());
    }

    let hours = sleep_hours(summary);
    if hours < 7.0 {
        out.push("Prioritize sleep - aim for 7-9 hours nightly for optimal health".to_string());
    } else if hours > 9.0 {
        out.push(
            "Consider evaluating sleep quality - excessive sleep may indicate underlying issues"
                .to_string(),
        );
    }

    if summary.bmi > 30.0 {
        out.push(
            "Consider weight management - consult healthcare provider for personalized plan"
                .to_string(),
        );
    } else if summary.bmi > 25.0 {
        out.push("Maintain healthy weight through balanced diet and regular exercise".to_string());
    } else if summary.bmi < 18.5 {
        out.push("Consider healthy weight gain - consult nutritionist if needed".to_string());
    }

    if summary.heart_rate_bpm > 100 {
        out.push(
            "Elevated heart rate detected - consider stress management and consult doctor"
                .to_string(),
        );
    } else if summary.heart_rate_bpm > 85 {
        out.push("Monitor heart rate - practice relaxation techniques".to_string());
    }

    if summary.spo2 < 95 {
        out.push("Low oxygen saturation - consult healthcare provider immediately".to_string());
    } else if summary.spo2 < 98 {
        out.push("Consider breathing exercises and monitor oxygen levels".to_string());
    }

    if summary.stress_level > 4 {
        out.push("Practice stress reduction - regular exercise and relaxation help".to_string());
    }

    if risks.diabetes.risk_percentage > 50 {
        out.push(
            "High diabetes risk - regular health checkups and blood sugar monitoring recommended"
                .to_string(),
        );
    }
    if risks.cardiovascular.risk_percentage > 50 {
        out.push(
            "Cardiovascular risk detected - heart-healthy diet and regular exercise important"
                .to_string(),
        );
    }
    if risks.obesity.risk_percentage > 50 {
        out.push("Weight management crucial - combine cardio and strength training".to_string());
    }
    if risks.sleep_disorders.risk_percentage > 50 {
        out.push(
            "Sleep issues detected - consider sleep hygiene improvements or sleep study"
                .to_string(),
        );
    }

    if out.is_empty() {
        out.push("Excellent health metrics! Keep maintaining your healthy lifestyle".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::whole_summary_fallback;
    use pretty_assertions::assert_eq;

    /// A summary with every metric in trouble at once.
    fn strained_summary() -> HealthSummary {
        HealthSummary {
            step_count: 1000,
            calories: 800,
            total_sleep_minutes: 120,
            bmi: 34.5,
            heart_rate_bpm: 95,
            spo2: 88,
            stress_level: 5,
        }
    }

    fn healthy_summary() -> HealthSummary {
        HealthSummary {
            step_count: 10000,
            calories: 2300,
            total_sleep_minutes: 480,
            bmi: 22.0,
            heart_rate_bpm: 70,
            spo2: 98,
            stress_level: 1,
        }
    }

    #[test]
    fn test_strained_summary_risk_percentages() {
        let report = analyze(&strained_summary());
        let risks = &report.detailed_risks;

        // 40 (bmi) + 30 (steps) + 10 (stress)
        assert_eq!(risks.diabetes.risk_percentage, 80);
        // 20 (hr) + 25 (bmi) + 10 (stress) + 15 (steps)
        assert_eq!(risks.cardiovascular.risk_percentage, 70);
        // 60 (bmi) + 25 (steps)
        assert_eq!(risks.obesity.risk_percentage, 85);
        // 40 (hours) + 15 (stress) + 15 (hr)
        assert_eq!(risks.sleep_disorders.risk_percentage, 70);

        assert_eq!(risks.diabetes.level, RiskLevel::High);
        assert_eq!(risks.cardiovascular.level, RiskLevel::High);
        assert_eq!(risks.obesity.level, RiskLevel::High);
        assert_eq!(risks.sleep_disorders.level, RiskLevel::High);

        // Mean 76.25
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.risk_color, "red");
        assert_eq!(report.health_score, 41.2);
    }

    #[test]
    fn test_strained_summary_recommendations() {
        let report = analyze(&strained_summary());
        let recs = &report.recommendations;

        // Six metric-driven plus four risk-driven entries.
        assert_eq!(recs.len(), 10);
        assert_eq!(
            recs[0],
            "Increase daily activity - aim for 10,000 steps per day"
        );
        assert!(recs
            .iter()
            .any(|r| r.contains("High diabetes risk")));
        assert!(recs
            .iter()
            .any(|r| r.contains("Low oxygen saturation")));
    }

    #[test]
    fn test_healthy_summary_scores_full_marks() {
        let report = analyze(&healthy_summary());

        assert_eq!(report.health_score, 100.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.risk_color, "green");
        assert_eq!(report.detailed_risks.diabetes.risk_percentage, 0);
        assert_eq!(
            report.recommendations,
            vec!["Excellent health metrics! Keep maintaining your healthy lifestyle".to_string()]
        );
    }

    #[test]
    fn test_fallback_summary_reports_low_risk() {
        let report = analyze(&whole_summary_fallback());

        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.detailed_risks.cardiovascular.risk_percentage, 0);
        assert_eq!(report.health_score, 92.6);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_per_risk_band_boundaries_are_strict() {
        assert_eq!(RiskLevel::from_percentage(61), RiskLevel::High);
        assert_eq!(RiskLevel::from_percentage(60), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_percentage(31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_percentage(30), RiskLevel::Low);
        assert_eq!(RiskLevel::from_percentage(0), RiskLevel::Low);
    }

    #[test]
    fn test_overall_band_boundaries() {
        assert_eq!(RiskLevel::from_average(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_average(30.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(59.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(60.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_points_cap_at_100() {
        let summary = HealthSummary {
            step_count: 100,
            calories: 4000,
            total_sleep_minutes: 60,
            bmi: 42.0,
            heart_rate_bpm: 130,
            spo2: 85,
            stress_level: 5,
        };
        let report = analyze(&summary);

        // 60 + 25 + 15 would already be 100; the cap keeps it there.
        assert_eq!(report.detailed_risks.obesity.risk_percentage, 100);
        assert!(report.detailed_risks.diabetes.risk_percentage <= 100);
        assert!(report.detailed_risks.cardiovascular.risk_percentage <= 100);
    }

    #[test]
    fn test_report_wire_shape() {
        let value = serde_json::to_value(analyze(&healthy_summary())).unwrap();

        assert_eq!(value["risk_level"], "Low");
        assert_eq!(value["risk_color"], "green");
        assert_eq!(value["detailed_risks"]["sleep_disorders"]["level"], "Low");
        assert_eq!(value["summary"]["step_count"], 10000);
        assert!(value["recommendations"].is_array());
    }
}
