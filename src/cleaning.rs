use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::ByteRecord;

use super::error::PrepError;
use super::geometry::ServiceArea;
use super::output_utils;
use super::time_bins::{TimeDiscretizer, Weekday};
use super::trips::{self, RowCounts, RowPolicy, TripColumns};


#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct CleaningSummary {
    pub admitted: u64,
    pub rejected: u64,
    /// Number of distinct vehicles among the admitted rows.
    pub vehicle_count: usize,
}

/// Copies the header and every row of `raw_path` whose pickup and dropoff both lie in `area`
/// to `cleaned_path`.  Rows with unreadable coordinates are dropped.
pub fn clean_file(raw_path: &Path, cleaned_path: &Path, area: &ServiceArea,
                  columns: &TripColumns) -> Result<CleaningSummary, PrepError> {
    log::info!("Cleaning {:?} into {:?}", raw_path, cleaned_path);
    let mut reader = trips::trip_reader(raw_path)?;
    let mut writer = output_utils::create_writer(cleaned_path, b',')?;
    writer.write_byte_record(reader.byte_headers()?)?;

    let mut summary = CleaningSummary::default();
    let mut vehicles = HashSet::new();
    let mut raw = ByteRecord::new();
    while reader.read_byte_record(&mut raw)? {
        let record = trips::decode_record(&raw);
        let admitted = match columns.endpoints(&record) {
            Ok((pickup, dropoff)) => area.admits(&pickup, &dropoff),
            Err(_) => false,
        };
        if !admitted {
            summary.rejected += 1;
            continue;
        }

        writer.write_byte_record(&raw)?;
        summary.admitted += 1;
        if let Ok(vehicle_id) = columns.vehicle_id(&record) {
            if !vehicles.contains(vehicle_id) {
                vehicles.insert(String::from(vehicle_id));
            }
        }
    }
    writer.flush().map_err(|err| PrepError::io(cleaned_path, err))?;

    summary.vehicle_count = vehicles.len();
    log::info!("Admitted {} rows, rejected {}", summary.admitted, summary.rejected);
    Ok(summary)
}


/// Selects which calendar days of a large trip file are kept.
#[derive(PartialEq, Debug, Clone)]
pub struct DaySample {
    pub weekdays: HashSet<Weekday>,
    /// The most distinct dates kept for each weekday.
    pub max_days: usize,
}

/// Reduces `raw_path` to rows on the weekdays of `sample`, keeping the first `max_days` dates
/// seen for each weekday.  Reading stops once every weekday is full and a row from yet another
/// date turns up.
pub fn sample_days(raw_path: &Path, sampled_path: &Path, sample: &DaySample,
                   columns: &TripColumns, disc: &TimeDiscretizer, policy: RowPolicy)
                   -> Result<RowCounts, PrepError> {
    log::info!("Sampling up to {} days of weekdays {:?} from {:?}", sample.max_days,
               sample.weekdays, raw_path);
    let mut reader = trips::trip_reader(raw_path)?;
    let mut writer = output_utils::create_writer(sampled_path, b',')?;
    writer.write_byte_record(reader.byte_headers()?)?;

    let mut dates_by_weekday: HashMap<Weekday, HashSet<NaiveDate>> = HashMap::new();
    let all_full = |dates_by_weekday: &HashMap<Weekday, HashSet<NaiveDate>>| {
        sample.weekdays.iter().all(|wd| {
            dates_by_weekday.get(wd).map_or(0, |dates| dates.len()) >= sample.max_days
        })
    };

    let mut counts = RowCounts::default();
    let mut raw = ByteRecord::new();
    while reader.read_byte_record(&mut raw)? {
        let record = trips::decode_record(&raw);
        let pickup_time = match columns.pickup_time(&record, disc) {
            Ok(time) => time,
            Err(err) if policy == RowPolicy::Skip => {
                log::debug!("skipping row: {}", err);
                counts.skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let weekday = pickup_time.weekday().num_days_from_monday();
        if !sample.weekdays.contains(&weekday) {
            continue;
        }
        let date = pickup_time.date();
        let dates = dates_by_weekday.entry(weekday).or_insert_with(HashSet::new);
        if !dates.contains(&date) {
            if dates.len() >= sample.max_days {
                if all_full(&dates_by_weekday) {
                    log::info!("All weekdays have {} days, stopping early", sample.max_days);
                    break;
                }
                continue;
            }
            dates.insert(date);
        }

        writer.write_byte_record(&raw)?;
        counts.used += 1;
    }
    writer.flush().map_err(|err| PrepError::io(sampled_path, err))?;

    log::info!("Kept {} rows", counts.used);
    Ok(counts)
}
