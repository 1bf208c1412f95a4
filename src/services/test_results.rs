use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::ops::{Bound, RangeBounds};

use crate::error::{AppError, Result};
use crate::models::{TestResult, TestResultStatus};

/// A lab assay the synthesizer can produce readings for.
#[derive(Debug, Clone, Copy)]
pub struct AssayDefinition {
    pub name: &'static str,
    pub unit: &'static str,
    pub draw_min: f64,
    pub draw_max: f64,
    pub decimals: u32,
    pub normal_band: (Bound<f64>, Bound<f64>),
}

impl AssayDefinition {
    pub fn is_normal(&self, value: f64) -> bool {
        self.normal_band.contains(&value)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = rng.gen_range(self.draw_min..=self.draw_max);
        round_to(raw, self.decimals).clamp(self.draw_min, self.draw_max)
    }
}

pub static ASSAYS: [AssayDefinition; 8] = [
    AssayDefinition {
        name: "Hemoglobin",
        unit: "g/dL",
        draw_min: 12.0,
        draw_max: 18.0,
        decimals: 1,
        normal_band: (Bound::Included(12.0), Bound::Included(17.0)),
    },
    AssayDefinition {
        name: "Glucose",
        unit: "mg/dL",
        draw_min: 70.0,
        draw_max: 120.0,
        decimals: 1,
        normal_band: (Bound::Included(70.0), Bound::Included(100.0)),
    },
    AssayDefinition {
        name: "Cholesterol",
        unit: "mg/dL",
        draw_min: 150.0,
        draw_max: 250.0,
        decimals: 1,
        normal_band: (Bound::Unbounded, Bound::Excluded(200.0)),
    },
    AssayDefinition {
        name: "White Blood Cell Count",
        unit: "cells/µL",
        draw_min: 4000.0,
        draw_max: 10000.0,
        decimals: 0,
        normal_band: (Bound::Included(4000.0), Bound::Included(11000.0)),
    },
    AssayDefinition {
        name: "Platelet Count",
        unit: "cells/µL",
        draw_min: 150000.0,
        draw_max: 350000.0,
        decimals: 0,
        normal_band: (Bound::Included(150000.0), Bound::Included(450000.0)),
    },
    AssayDefinition {
        name: "Creatinine",
        unit: "mg/dL",
        draw_min: 0.6,
        draw_max: 1.8,
        decimals: 2,
        normal_band: (Bound::Unbounded, Bound::Included(1.2)),
    },
    AssayDefinition {
        name: "ALT",
        unit: "U/L",
        draw_min: 7.0,
        draw_max: 47.0,
        decimals: 1,
        normal_band: (Bound::Unbounded, Bound::Included(40.0)),
    },
    AssayDefinition {
        name: "AST",
        unit: "U/L",
        draw_min: 10.0,
        draw_max: 45.0,
        decimals: 1,
        normal_band: (Bound::Unbounded, Bound::Included(40.0)),
    },
];

pub fn find_assay(name: &str) -> Option<&'static AssayDefinition> {
    ASSAYS.iter().find(|assay| assay.name == name)
}

/// Produces synthetic diagnostic results. Stateless; safe to share freely.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultSynthesizer;

impl ResultSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// `count` results, one per day ending now, newest first.
    pub fn generate(&self, count: usize) -> Result<Vec<TestResult>> {
        self.generate_with(&mut rand::thread_rng(), count, Utc::now())
    }

    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<TestResult>> {
        if count < 1 {
            return Err(AppError::InvalidInput(
                "Result count must be at least 1".to_string(),
            ));
        }

        let mut results: Vec<TestResult> = (0..count)
            .map(|i| {
                let assay = &ASSAYS[rng.gen_range(0..ASSAYS.len())];
                let value = assay.draw(&mut *rng);

                TestResult {
                    timestamp: now - Duration::days(i as i64),
                    test_type: assay.name.to_string(),
                    value,
                    unit: assay.unit.to_string(),
                    status: if assay.is_normal(value) {
                        TestResultStatus::Normal
                    } else {
                        TestResultStatus::Abnormal
                    },
                }
            })
            .collect();

        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::debug!(count = results.len(), "Generated synthetic test results");
        Ok(results)
    }
}

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
