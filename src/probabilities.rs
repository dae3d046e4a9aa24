use std::collections::HashSet;
use std::path::Path;

use super::aggregation::OdTables;
use super::error::PrepError;
use super::output_utils::{self, fmt_float};
use super::stations::StationId;
use super::time_bins::{Tau, Weekday};


pub const PROBABILITY_FIELDS: [&str; 5] = ["tau", "day", "pickup", "dropoff", "probability"];
pub const FREQUENCY_FIELDS: [&str; 2] = ["time_interval", "expected_requests"];

#[derive(PartialEq, Debug, Clone)]
pub struct ProbabilityRecord {
    pub tau: Tau,
    pub day: Weekday,
    pub pickup: StationId,
    pub dropoff: StationId,
    pub probability: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FrequencyRecord {
    pub tau: Tau,
    /// Mean number of passengers in this time bin over the weekdays it was observed on.
    pub expected_requests: f64,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct ProbabilityTables {
    pub probabilities: Vec<ProbabilityRecord>,
    pub frequencies: Vec<FrequencyRecord>,
}

/// Normalizes the OD counts of each (tau, day) bin into probabilities, and derives the expected
/// number of requests per tau.  Rows come out in the order the bins and pairs were first seen;
/// each tau's frequency row is emitted when that tau first comes up.
pub fn build_probability_tables(tables: OdTables) -> ProbabilityTables {
    let mut output = ProbabilityTables::default();
    let mut seen_taus: HashSet<Tau> = HashSet::new();
    for ((tau, day), pair_counts) in tables.od_counts() {
        let bin_total = tables.bin_total(&(*tau, *day));
        if bin_total == 0 {
            log::warn!("Bin (tau {}, day {}) has no passengers; its probabilities are 0", tau,
                       day);
        }

        for ((pickup, dropoff), count) in pair_counts {
            let probability = if bin_total > 0 {
                *count as f64 / bin_total as f64
            } else {
                0.
            };
            output.probabilities.push(ProbabilityRecord {
                tau: *tau,
                day: *day,
                pickup: *pickup,
                dropoff: *dropoff,
                probability,
            });

            if seen_taus.insert(*tau) {
                let num_days = tables.num_days(*tau);
                let tau_total = tables.tau_total(*tau);
                output.frequencies.push(FrequencyRecord {
                    tau: *tau,
                    expected_requests: tau_total as f64 / num_days as f64,
                });
            }
        }
    }

    output
}

impl ProbabilityTables {
    pub fn write_probabilities(&self, path: &Path) -> Result<(), PrepError> {
        let mut writer = output_utils::create_writer(path, b',')?;
        writer.write_record(&PROBABILITY_FIELDS)?;
        for record in &self.probabilities {
            writer.write_record(&[
                record.tau.to_string(),
                record.day.to_string(),
                record.pickup.to_string(),
                record.dropoff.to_string(),
                fmt_float(record.probability),
            ])?;
        }
        writer.flush().map_err(|err| PrepError::io(path, err))?;
        Ok(())
    }

    pub fn write_frequencies(&self, path: &Path) -> Result<(), PrepError> {
        let mut writer = output_utils::create_writer(path, b',')?;
        writer.write_record(&FREQUENCY_FIELDS)?;
        for record in &self.frequencies {
            writer.write_record(&[record.tau.to_string(), fmt_float(record.expected_requests)])?;
        }
        writer.flush().map_err(|err| PrepError::io(path, err))?;
        Ok(())
    }
}
