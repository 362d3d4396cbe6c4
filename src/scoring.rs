//! Fit and final scores.
//!
//! Fit is a weighted sum of independently capped sub-scores. Magnitudes that
//! span orders of magnitude (headcount, spend) are log-compressed against a
//! billion so a 10x bigger company is not worth 10x the points.

use crate::models::{Badge, ScoringPolicy};
use serde::Serialize;

const LOG_CEILING: f64 = 1_000_000_000.0;

pub const EMPLOYEE_POINTS: f64 = 10.0;
pub const IT_SPEND_POINTS: f64 = 15.0;
pub const ANNUAL_SPEND_POINTS: f64 = 15.0;
pub const TECH_BREADTH_POINTS: f64 = 15.0;
pub const INTENSITY_POINTS: f64 = 15.0;
pub const CLOUD_SPEND_POINTS: f64 = 20.0;
pub const FUNCTIONAL_AREA_POINTS: f64 = 10.0;

const TECH_BREADTH_SATURATION: f64 = 50.0;
const INTENSITY_SATURATION: f64 = 2000.0;
const POINTS_PER_AREA: f64 = 2.0;

/// Raw inputs of the fit score, gathered from the signal summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitInputs {
    pub employees: f64,
    pub firmographic_it_spend: f64,
    pub annual_spend: f64,
    /// Installs actually delivered by the technographic tool.
    pub install_count: usize,
    /// Mean intensity across every delivered install.
    pub avg_intensity: Option<f64>,
    pub cloud_monthly_spend: f64,
    pub area_count: u64,
}

/// Every capped sub-score of a fit computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitBreakdown {
    pub employees: f64,
    pub it_spend: f64,
    pub annual_spend: f64,
    pub tech_breadth: f64,
    pub intensity: f64,
    pub cloud_spend: f64,
    pub functional_areas: f64,
}

impl FitBreakdown {
    pub fn total(&self) -> f64 {
        self.employees
            + self.it_spend
            + self.annual_spend
            + self.tech_breadth
            + self.intensity
            + self.cloud_spend
            + self.functional_areas
    }
}

/// Log-compressed points: `max_points * log10(v + 1) / log10(1e9)`, capped.
pub fn log_score(value: f64, max_points: f64) -> f64 {
    if !(value > 0.0) {
        return 0.0;
    }
    let scaled = max_points * ((value + 1.0).log10() / LOG_CEILING.log10());
    scaled.min(max_points)
}

fn linear_score(value: f64, saturation: f64, max_points: f64) -> f64 {
    if !(value > 0.0) {
        return 0.0;
    }
    (value / saturation * max_points).min(max_points)
}

pub fn fit_breakdown(inputs: &FitInputs, policy: ScoringPolicy) -> FitBreakdown {
    let core = FitBreakdown {
        employees: log_score(inputs.employees, EMPLOYEE_POINTS),
        it_spend: log_score(inputs.firmographic_it_spend, IT_SPEND_POINTS),
        tech_breadth: linear_score(
            inputs.install_count as f64,
            TECH_BREADTH_SATURATION,
            TECH_BREADTH_POINTS,
        ),
        intensity: linear_score(
            inputs.avg_intensity.unwrap_or(0.0),
            INTENSITY_SATURATION,
            INTENSITY_POINTS,
        ),
        ..FitBreakdown::default()
    };

    match policy {
        ScoringPolicy::RecencyOnly => core,
        ScoringPolicy::ContractAware => FitBreakdown {
            annual_spend: log_score(inputs.annual_spend, ANNUAL_SPEND_POINTS),
            cloud_spend: log_score(inputs.cloud_monthly_spend, CLOUD_SPEND_POINTS),
            functional_areas: (inputs.area_count as f64 * POINTS_PER_AREA)
                .min(FUNCTIONAL_AREA_POINTS),
            ..core
        },
    }
}

/// Fit score rounded to two decimals. Not clamped to 100.
pub fn fit_score(inputs: &FitInputs, policy: ScoringPolicy) -> f64 {
    round2(fit_breakdown(inputs, policy).total())
}

/// Timing boost added on top of the fit score.
pub fn badge_boost(badge: Badge, policy: ScoringPolicy) -> f64 {
    match (policy, badge) {
        (ScoringPolicy::ContractAware, Badge::Hot) => 15.0,
        (ScoringPolicy::ContractAware, Badge::Warm) => 7.0,
        (ScoringPolicy::RecencyOnly, Badge::Hot) => 20.0,
        (ScoringPolicy::RecencyOnly, Badge::Warm) => 10.0,
        (_, Badge::Cold) => 0.0,
    }
}

/// Fit plus timing boost. Used only for ranking, never re-clamped.
pub fn final_score(fit: f64, badge: Badge, policy: ScoringPolicy) -> f64 {
    fit + badge_boost(badge, policy)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
