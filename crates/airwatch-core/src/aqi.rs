//! Air quality index calculation.
//!
//! Converts pollutant concentrations into a single 0-500 index using
//! piecewise-linear breakpoint tables, one per pollutant. Only PM2.5, PM10
//! and CO2 contribute; the overall index is the largest sub-index and the
//! pollutant that produced it is reported as primary.
//!
//! Breakpoint and category tables are plain data ([`AqiTables`]) and can be
//! loaded from configuration without touching the interpolation.
//!
//! # Example
//!
//! ```
//! use airwatch_core::AqiCalculator;
//! use airwatch_types::{AqiCategory, Parameter, Reading};
//! use time::OffsetDateTime;
//!
//! let calculator = AqiCalculator::default();
//! let reading = Reading {
//!     timestamp: OffsetDateTime::now_utc(),
//!     temperature: 22.0,
//!     humidity: 50.0,
//!     co2: 400.0,
//!     pm25: 10.0,
//!     pm10: 20.0,
//!     light: 1000.0,
//! };
//!
//! let aqi = calculator.compute(&reading);
//! assert_eq!(aqi.category, AqiCategory::Good);
//! assert_eq!(aqi.primary_pollutant, Parameter::Pm25);
//! ```

use serde::{Deserialize, Serialize};

use airwatch_types::{AQI_MAX, AqiCategory, AqiResult, Parameter, Reading};

use crate::error::{Error, Result};

/// Pollutants that contribute to the index, in tie-break priority order.
pub const AQI_POLLUTANTS: [Parameter; 3] = [Parameter::Pm25, Parameter::Pm10, Parameter::Co2];

/// One segment of a breakpoint table: `[c_lo, c_hi]` maps onto `[i_lo, i_hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub c_lo: f64,
    pub c_hi: f64,
    pub i_lo: u16,
    pub i_hi: u16,
}

impl Breakpoint {
    /// Shorthand constructor.
    pub const fn new(c_lo: f64, c_hi: f64, i_lo: u16, i_hi: u16) -> Self {
        Self {
            c_lo,
            c_hi,
            i_lo,
            i_hi,
        }
    }

    fn interpolate(&self, concentration: f64) -> u16 {
        let c = concentration.clamp(self.c_lo, self.c_hi);
        let slope = f64::from(self.i_hi - self.i_lo) / (self.c_hi - self.c_lo);
        let index = slope * (c - self.c_lo) + f64::from(self.i_lo);
        index.round() as u16
    }
}

/// Piecewise-linear mapping from a pollutant concentration to a sub-index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointTable(Vec<Breakpoint>);

impl BreakpointTable {
    /// Create a table from ordered segments.
    ///
    /// Segments must be non-empty, ascending and non-overlapping in both
    /// concentration and index, with `c_hi > c_lo` and indices within
    /// `0..=500`.
    pub fn new(segments: Vec<Breakpoint>) -> Result<Self> {
        let table = Self(segments);
        table.validate()?;
        Ok(table)
    }

    /// The segments of the table.
    pub fn segments(&self) -> &[Breakpoint] {
        &self.0
    }

    /// The index reported for concentrations above the top breakpoint.
    pub fn max_index(&self) -> u16 {
        self.0.last().map_or(0, |bp| bp.i_hi)
    }

    /// Compute the sub-index for a concentration.
    ///
    /// The first segment whose upper bound covers the concentration is used.
    /// Concentrations in the gap below that segment's lower bound evaluate
    /// at the lower bound; concentrations above the table clamp to
    /// [`max_index`](Self::max_index).
    pub fn sub_index(&self, concentration: f64) -> u16 {
        self.0
            .iter()
            .find(|bp| concentration <= bp.c_hi)
            .map_or_else(|| self.max_index(), |bp| bp.interpolate(concentration))
    }

    fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidConfig(
                "breakpoint table must have at least one segment".to_string(),
            ));
        }
        for (i, bp) in self.0.iter().enumerate() {
            if !(bp.c_lo.is_finite() && bp.c_hi.is_finite()) || bp.c_hi <= bp.c_lo {
                return Err(Error::InvalidConfig(format!(
                    "breakpoint {}: concentration range {}..{} is empty or not finite",
                    i, bp.c_lo, bp.c_hi
                )));
            }
            if bp.i_hi < bp.i_lo || bp.i_hi > AQI_MAX {
                return Err(Error::InvalidConfig(format!(
                    "breakpoint {}: index range {}..{} is invalid",
                    i, bp.i_lo, bp.i_hi
                )));
            }
        }
        for (i, pair) in self.0.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.c_lo < prev.c_hi || next.i_lo < prev.i_hi {
                return Err(Error::InvalidConfig(format!(
                    "breakpoint {} overlaps breakpoint {}",
                    i + 1,
                    i
                )));
            }
        }
        Ok(())
    }
}

/// Index range mapped to a category and display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBand {
    pub min: u16,
    pub max: u16,
    pub category: AqiCategory,
    pub color: String,
}

impl CategoryBand {
    fn new(min: u16, max: u16, category: AqiCategory, color: &str) -> Self {
        Self {
            min,
            max,
            category,
            color: color.to_string(),
        }
    }

    fn contains(&self, value: u16) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Breakpoint and category tables driving [`AqiCalculator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiTables {
    pub pm25: BreakpointTable,
    pub pm10: BreakpointTable,
    pub co2: BreakpointTable,
    pub categories: Vec<CategoryBand>,
}

impl Default for AqiTables {
    /// US EPA breakpoints for particulates and an indoor CO2 scale.
    fn default() -> Self {
        Self {
            pm25: BreakpointTable(vec![
                Breakpoint::new(0.0, 12.0, 0, 50),
                Breakpoint::new(12.1, 35.4, 51, 100),
                Breakpoint::new(35.5, 55.4, 101, 150),
                Breakpoint::new(55.5, 150.4, 151, 200),
                Breakpoint::new(150.5, 250.4, 201, 300),
                Breakpoint::new(250.5, 500.4, 301, 500),
            ]),
            pm10: BreakpointTable(vec![
                Breakpoint::new(0.0, 54.0, 0, 50),
                Breakpoint::new(55.0, 154.0, 51, 100),
                Breakpoint::new(155.0, 254.0, 101, 150),
                Breakpoint::new(255.0, 354.0, 151, 200),
                Breakpoint::new(355.0, 424.0, 201, 300),
                Breakpoint::new(425.0, 604.0, 301, 500),
            ]),
            co2: BreakpointTable(vec![
                Breakpoint::new(0.0, 600.0, 0, 50),
                Breakpoint::new(601.0, 1000.0, 51, 100),
                Breakpoint::new(1001.0, 1500.0, 101, 150),
                Breakpoint::new(1501.0, 2000.0, 151, 200),
                Breakpoint::new(2001.0, 5000.0, 201, 300),
                Breakpoint::new(5001.0, 10000.0, 301, 500),
            ]),
            categories: vec![
                CategoryBand::new(0, 50, AqiCategory::Good, "#00e400"),
                CategoryBand::new(51, 100, AqiCategory::Moderate, "#ffff00"),
                CategoryBand::new(101, 150, AqiCategory::UnhealthyForSensitiveGroups, "#ff7e00"),
                CategoryBand::new(151, 200, AqiCategory::Unhealthy, "#ff0000"),
                CategoryBand::new(201, 300, AqiCategory::VeryUnhealthy, "#8f3f97"),
                CategoryBand::new(301, 500, AqiCategory::Hazardous, "#7e0023"),
            ],
        }
    }
}

impl AqiTables {
    /// Get the breakpoint table for a contributing pollutant.
    pub fn table(&self, parameter: Parameter) -> Option<&BreakpointTable> {
        match parameter {
            Parameter::Pm25 => Some(&self.pm25),
            Parameter::Pm10 => Some(&self.pm10),
            Parameter::Co2 => Some(&self.co2),
            _ => None,
        }
    }

    /// Validate all tables.
    ///
    /// Category bands must start at 0, be contiguous, and reach 500.
    pub fn validate(&self) -> Result<()> {
        for parameter in AQI_POLLUTANTS {
            if let Some(table) = self.table(parameter) {
                table.validate().map_err(|e| match e {
                    Error::InvalidConfig(msg) => {
                        Error::InvalidConfig(format!("{} table: {}", parameter, msg))
                    }
                    other => other,
                })?;
            }
        }

        let mut expected_min = 0u16;
        for band in &self.categories {
            if band.min != expected_min || band.max < band.min {
                return Err(Error::InvalidConfig(format!(
                    "category band {}..{} must start at {}",
                    band.min, band.max, expected_min
                )));
            }
            expected_min = band.max.saturating_add(1);
        }
        if self.categories.last().map(|b| b.max) != Some(AQI_MAX) {
            return Err(Error::InvalidConfig(format!(
                "category bands must cover 0..={}",
                AQI_MAX
            )));
        }
        Ok(())
    }

    /// Look up the category band for an index value.
    pub fn band(&self, value: u16) -> Option<&CategoryBand> {
        self.categories.iter().find(|b| b.contains(value))
    }
}

/// Air quality index calculator.
#[derive(Debug, Clone, Default)]
pub struct AqiCalculator {
    tables: AqiTables,
}

impl AqiCalculator {
    /// Create a calculator from validated tables.
    pub fn new(tables: AqiTables) -> Result<Self> {
        tables.validate()?;
        Ok(Self { tables })
    }

    /// Get the tables.
    pub fn tables(&self) -> &AqiTables {
        &self.tables
    }

    /// Sub-index of every contributing pollutant, in priority order.
    pub fn sub_indices(&self, reading: &Reading) -> [(Parameter, u16); 3] {
        AQI_POLLUTANTS.map(|p| {
            let index = self
                .tables
                .table(p)
                .map_or(0, |t| t.sub_index(reading.value(p)));
            (p, index)
        })
    }

    /// Compute the index for a reading.
    ///
    /// Ties between pollutants go to the earlier entry of [`AQI_POLLUTANTS`].
    pub fn compute(&self, reading: &Reading) -> AqiResult {
        let mut primary = (Parameter::Pm25, 0u16);
        for (i, (parameter, index)) in self.sub_indices(reading).into_iter().enumerate() {
            if i == 0 || index > primary.1 {
                primary = (parameter, index);
            }
        }
        let (primary_pollutant, value) = primary;

        let (category, color) = match self.tables.band(value) {
            Some(band) => (band.category, band.color.clone()),
            None => (AqiCategory::Hazardous, "#7e0023".to_string()),
        };

        AqiResult {
            value,
            category,
            color,
            primary_pollutant,
        }
    }
}


/// Property-based tests for index invariants.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::datetime;

    fn reading(co2: f64, pm25: f64, pm10: f64) -> Reading {
        Reading {
            timestamp: datetime!(2024-01-01 12:00 UTC),
            temperature: 22.0,
            humidity: 50.0,
            co2,
            pm25,
            pm10,
            light: 0.0,
        }
    }

    proptest! {
        /// Raising any single pollutant never lowers the index.
        #[test]
        fn monotonic_in_each_pollutant(
            co2 in 0.0f64..12000.0,
            pm25 in 0.0f64..600.0,
            pm10 in 0.0f64..700.0,
            delta in 0.0f64..500.0,
            which in 0usize..3,
        ) {
            let calc = AqiCalculator::default();
            let base = calc.compute(&reading(co2, pm25, pm10)).value;
            let raised = match which {
                0 => reading(co2 + delta, pm25, pm10),
                1 => reading(co2, pm25 + delta, pm10),
                _ => reading(co2, pm25, pm10 + delta),
            };
            prop_assert!(calc.compute(&raised).value >= base);
        }

        /// The primary pollutant is the one whose sub-index equals the value.
        #[test]
        fn primary_pollutant_owns_value(
            co2 in 0.0f64..12000.0,
            pm25 in 0.0f64..600.0,
            pm10 in 0.0f64..700.0,
        ) {
            let calc = AqiCalculator::default();
            let r = reading(co2, pm25, pm10);
            let aqi = calc.compute(&r);
            let subs = calc.sub_indices(&r);
            prop_assert!(aqi.value <= AQI_MAX);
            prop_assert!(subs.iter().all(|(_, i)| *i <= aqi.value));
            prop_assert!(subs.contains(&(aqi.primary_pollutant, aqi.value)));
        }
    }
}
