//! The survey dataset backing the agent's data tools.
//!
//! The dataset is constructed once at startup and never mutated. In
//! production this would be an API client; here it carries the fixed Youth
//! Risk Behavior Survey figures the demonstration runs against.

use std::collections::BTreeMap;

use serde::Serialize;

/// A rate observation for one subgroup in one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePoint {
    pub value: f64,
    pub sample_size: u32,
}

/// The overall rate for one year, with its confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallRate {
    pub value: f64,
    pub sample_size: u32,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Demographic dimensions the data can be broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Grade,
    Sex,
    Race,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Grade, Dimension::Sex, Dimension::Race];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Grade => "grade",
            Dimension::Sex => "sex",
            Dimension::Race => "race",
        }
    }

    pub fn parse(s: &str) -> Option<Dimension> {
        match s {
            "grade" => Some(Dimension::Grade),
            "sex" => Some(Dimension::Sex),
            "race" => Some(Dimension::Race),
            _ => None,
        }
    }
}

/// Subgroup rates for one year, keyed by subgroup name.
pub type YearBreakdown = BTreeMap<String, RatePoint>;

/// Read-only survey data keyed by year and demographic dimension.
#[derive(Debug, Clone)]
pub struct Dataset {
    years: Vec<String>,
    overall: BTreeMap<String, OverallRate>,
    by_grade: BTreeMap<String, YearBreakdown>,
    by_sex: BTreeMap<String, YearBreakdown>,
    by_race: BTreeMap<String, YearBreakdown>,
}

impl Dataset {
    /// Years the survey was conducted, in chronological order.
    pub fn available_years(&self) -> &[String] {
        &self.years
    }

    /// Comma-separated year list for error guidance.
    pub fn years_summary(&self) -> String {
        self.years.join(", ")
    }

    pub fn overall_rate(&self, year: &str) -> Option<&OverallRate> {
        self.overall.get(year)
    }

    /// Subgroup breakdown for one dimension and year.
    pub fn breakdown(&self, dimension: Dimension, year: &str) -> Option<&YearBreakdown> {
        self.table(dimension).get(year)
    }

    /// Per-year observations for a single subgroup, in chronological order.
    /// Years where the subgroup was not surveyed yield `None`.
    pub fn subgroup_series(
        &self,
        dimension: Dimension,
        subgroup: &str,
    ) -> Vec<(&str, Option<RatePoint>)> {
        let table = self.table(dimension);
        self.years
            .iter()
            .map(|year| {
                let point = table.get(year).and_then(|b| b.get(subgroup)).copied();
                (year.as_str(), point)
            })
            .collect()
    }

    /// Subgroup names present anywhere in the given dimension.
    pub fn subgroups(&self, dimension: Dimension) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .table(dimension)
            .values()
            .flat_map(|b| b.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn table(&self, dimension: Dimension) -> &BTreeMap<String, YearBreakdown> {
        match dimension {
            Dimension::Grade => &self.by_grade,
            Dimension::Sex => &self.by_sex,
            Dimension::Race => &self.by_race,
        }
    }

    /// The fixed demonstration dataset (middle-school marijuana use,
    /// biennial survey 2011-2019).
    pub fn sample() -> Self {
        let years: Vec<String> = ["2011", "2013", "2015", "2017", "2019"]
            .iter()
            .map(|y| y.to_string())
            .collect();

        let overall = [
            ("2011", 8.4, 1180, 7.2, 9.6),
            ("2013", 9.8, 1250, 8.5, 11.1),
            ("2015", 11.2, 1350, 9.8, 12.6),
            ("2017", 12.6, 1403, 11.1, 14.1),
            ("2019", 14.1, 1520, 12.5, 15.7),
        ]
        .iter()
        .map(|&(year, value, sample_size, ci_low, ci_high)| {
            (
                year.to_string(),
                OverallRate {
                    value,
                    sample_size,
                    ci_low,
                    ci_high,
                },
            )
        })
        .collect();

        let by_grade = breakdown_table(&[
            ("2011", &[("6th", 5.2, 320), ("7th", 8.1, 410), ("8th", 12.1, 440)]),
            ("2013", &[("6th", 6.1, 340), ("7th", 9.5, 445), ("8th", 13.8, 455)]),
            ("2015", &[("6th", 7.8, 380), ("7th", 11.1, 485), ("8th", 14.9, 470)]),
            ("2017", &[("6th", 9.0, 394), ("7th", 12.7, 504), ("8th", 16.5, 490)]),
            ("2019", &[("6th", 10.2, 420), ("7th", 14.0, 540), ("8th", 18.1, 550)]),
        ]);

        let by_sex = breakdown_table(&[
            ("2011", &[("Female", 8.9, 590), ("Male", 7.8, 585)]),
            ("2013", &[("Female", 10.5, 625), ("Male", 9.0, 620)]),
            ("2015", &[("Female", 12.1, 680), ("Male", 10.2, 665)]),
            ("2017", &[("Female", 14.8, 703), ("Male", 10.5, 694)]),
            ("2019", &[("Female", 16.2, 760), ("Male", 12.0, 755)]),
        ]);

        let by_race = breakdown_table(&[
            (
                "2011",
                &[
                    ("Hispanic or Latino", 11.2, 520),
                    ("Black or African American", 8.1, 280),
                    ("White", 5.9, 130),
                    ("Asian", 3.8, 95),
                ],
            ),
            (
                "2013",
                &[
                    ("Hispanic or Latino", 12.8, 560),
                    ("Black or African American", 9.5, 290),
                    ("White", 6.5, 140),
                    ("Asian", 4.2, 105),
                ],
            ),
            (
                "2015",
                &[
                    ("Hispanic or Latino", 14.5, 610),
                    ("Black or African American", 10.8, 305),
                    ("White", 7.2, 148),
                    ("Asian", 4.9, 118),
                ],
            ),
            (
                "2017",
                &[
                    ("Hispanic or Latino", 16.8, 638),
                    ("Black or African American", 11.9, 312),
                    ("White", 6.8, 155),
                    ("Asian", 5.3, 123),
                ],
            ),
            (
                "2019",
                &[
                    ("Hispanic or Latino", 18.5, 680),
                    ("Black or African American", 13.2, 340),
                    ("White", 8.1, 170),
                    ("Asian", 6.0, 135),
                ],
            ),
        ]);

        Self {
            years,
            overall,
            by_grade,
            by_sex,
            by_race,
        }
    }
}

fn breakdown_table(
    rows: &[(&str, &[(&str, f64, u32)])],
) -> BTreeMap<String, YearBreakdown> {
    rows.iter()
        .map(|&(year, subgroups)| {
            let breakdown = subgroups
                .iter()
                .map(|&(name, value, sample_size)| {
                    (name.to_string(), RatePoint { value, sample_size })
                })
                .collect();
            (year.to_string(), breakdown)
        })
        .collect()
}

/// Round to one decimal, the precision the survey reports rates at.
pub fn round_rate(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
