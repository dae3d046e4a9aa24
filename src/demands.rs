use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;

use super::error::PrepError;
use super::output_utils::{self, fmt_float};
use super::stations::{StationId, StationIndex};
use super::time_bins::{DemandGroupKey, TimeDiscretizer};
use super::trips::{self, RowCounts, RowPolicy, TripColumns, TripRecord};


pub const DEFAULT_DEMAND_FILE_TEMPLATE: &str = "demands_{weekday}_{week}_{year}.csv";

/// One trip request as the simulator replays it.
#[derive(PartialEq, Debug, Clone)]
pub struct DemandRecord {
    pub pickup_epoch_s: i64,
    pub pickup_station: StationId,
    pub dropoff_epoch_s: i64,
    pub dropoff_lon: f64,
    pub dropoff_lat: f64,
    pub dropoff_station: StationId,
    pub pickup_lon: f64,
    pub pickup_lat: f64,
}

impl DemandRecord {
    fn to_fields(&self) -> [String; 8] {
        [
            self.pickup_epoch_s.to_string(),
            self.pickup_station.to_string(),
            self.dropoff_epoch_s.to_string(),
            fmt_float(self.dropoff_lon),
            fmt_float(self.dropoff_lat),
            self.dropoff_station.to_string(),
            fmt_float(self.pickup_lon),
            fmt_float(self.pickup_lat),
        ]
    }
}

/// How rows are gathered into per-day groups before they are written.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DemandGrouping {
    /// Hold every group in memory and write them once the input is exhausted.  Works for input
    /// in any order.
    Buffered,
    /// Hold one group at a time, writing it when the key changes.  Requires the rows of each
    /// group to be contiguous, and fails if a flushed group shows up again.
    Streaming,
}

impl FromStr for DemandGrouping {
    type Err = PrepError;

    fn from_str(ss: &str) -> Result<DemandGrouping, PrepError> {
        match ss {
            "buffered" => Ok(DemandGrouping::Buffered),
            "streaming" => Ok(DemandGrouping::Streaming),
            _ => Err(PrepError::Config(format!("unknown demand grouping {:?}", ss))),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct DemandFile {
    pub key: DemandGroupKey,
    pub path: PathBuf,
    pub num_records: usize,
}

const TEMPLATE_FIELDS: [&str; 3] = ["{weekday}", "{week}", "{year}"];

/// A template that leaves out a field would send several days to the same file.
pub fn check_file_template(template: &str) -> Result<(), PrepError> {
    // `{week}` is not a substring of `{weekday}`
    let missing: Vec<&str> = TEMPLATE_FIELDS.iter().copied()
                                            .filter(|field| !template.contains(field))
                                            .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PrepError::Config(format!("demand file template {:?} lacks {}", template,
                                      missing.join(", "))))
    }
}

/// Substitutes `{weekday}`, `{week}` and `{year}` in a file name template.
pub fn demand_file_name(template: &str, key: &DemandGroupKey) -> String {
    template.replace("{weekday}", &key.weekday.to_string())
            .replace("{week}", &key.iso_week.to_string())
            .replace("{year}", &key.year.to_string())
}


/// Writes one demand file per calendar day found in a cleaned trip file.
pub struct DemandPartitioner<'a> {
    index: &'a StationIndex,
    disc: &'a TimeDiscretizer,
    columns: &'a TripColumns,
    policy: RowPolicy,
    grouping: DemandGrouping,
    out_dir: PathBuf,
    file_template: String,
}

impl<'a> DemandPartitioner<'a> {
    pub fn new(index: &'a StationIndex, disc: &'a TimeDiscretizer, columns: &'a TripColumns,
               policy: RowPolicy, grouping: DemandGrouping, out_dir: &Path, file_template: &str)
               -> DemandPartitioner<'a> {
        DemandPartitioner {
            index,
            disc,
            columns,
            policy,
            grouping,
            out_dir: out_dir.to_path_buf(),
            file_template: String::from(file_template),
        }
    }

    fn to_demand(&self, trip: &TripRecord) -> Result<(DemandGroupKey, DemandRecord), PrepError> {
        let stations = self.index.nearest_batch(&[trip.pickup, trip.dropoff])?;
        let record = DemandRecord {
            pickup_epoch_s: self.disc.epoch_seconds(&trip.pickup_time)?,
            pickup_station: stations[0],
            dropoff_epoch_s: self.disc.epoch_seconds(&trip.dropoff_time)?,
            dropoff_lon: trip.dropoff.x_coord,
            dropoff_lat: trip.dropoff.y_coord,
            dropoff_station: stations[1],
            pickup_lon: trip.pickup.x_coord,
            pickup_lat: trip.pickup.y_coord,
        };
        Ok((self.disc.group_key(&trip.pickup_time), record))
    }

    pub fn partition_file(&self, path: &Path) -> Result<(Vec<DemandFile>, RowCounts), PrepError> {
        log::info!("Creating demand files from {:?} in {:?}", path, self.out_dir);
        std::fs::create_dir_all(&self.out_dir).map_err(|err| PrepError::io(&self.out_dir, err))?;
        let result = match self.grouping {
            DemandGrouping::Buffered => self.partition_buffered(path),
            DemandGrouping::Streaming => self.partition_streaming(path),
        };
        if let Ok((files, _)) = &result {
            log::info!("Wrote {} demand files", files.len());
        }
        result
    }

    fn partition_buffered(&self, path: &Path) -> Result<(Vec<DemandFile>, RowCounts), PrepError> {
        let mut groups: IndexMap<DemandGroupKey, Vec<DemandRecord>> = IndexMap::new();
        let counts = trips::scan_trip_rows(path, self.policy, |row| {
            let trip = TripRecord::from_record(row, self.columns, self.disc)?;
            let (key, record) = self.to_demand(&trip)?;
            groups.entry(key).or_insert_with(Vec::new).push(record);
            Ok(())
        })?;

        let mut files = vec![];
        for (key, records) in groups {
            files.push(self.write_group(&key, &records)?);
        }
        Ok((files, counts))
    }

    fn partition_streaming(&self, path: &Path)
                           -> Result<(Vec<DemandFile>, RowCounts), PrepError> {
        let mut files = vec![];
        let mut flushed: HashSet<DemandGroupKey> = HashSet::new();
        let mut current: Option<DemandGroupKey> = None;
        let mut buffer: Vec<DemandRecord> = vec![];
        let counts = trips::scan_trip_rows(path, self.policy, |row| {
            let trip = TripRecord::from_record(row, self.columns, self.disc)?;
            let (key, record) = self.to_demand(&trip)?;
            if let Some(cur_key) = current {
                if cur_key != key {
                    if flushed.contains(&key) {
                        return Err(PrepError::NonContiguousGroup(key));
                    }
                    files.push(self.write_group(&cur_key, &buffer)?);
                    flushed.insert(cur_key);
                    buffer.clear();
                }
            }
            current = Some(key);
            buffer.push(record);
            Ok(())
        })?;

        if let Some(cur_key) = current {
            files.push(self.write_group(&cur_key, &buffer)?);
        }
        Ok((files, counts))
    }

    /// Writes a single group's file: its record count, then the records.  The file is closed
    /// before this returns.
    fn write_group(&self, key: &DemandGroupKey, records: &[DemandRecord])
                   -> Result<DemandFile, PrepError> {
        let path = self.out_dir.join(demand_file_name(&self.file_template, key));
        {
            let mut writer = output_utils::create_writer(&path, b' ')?;
            writer.write_record(&[records.len().to_string()])?;
            for record in records {
                writer.write_record(&record.to_fields())?;
            }
            writer.flush().map_err(|err| PrepError::io(&path, err))?;
        }
        log::debug!("Wrote {} demands to {:?}", records.len(), path);
        Ok(DemandFile {key: *key, path, num_records: records.len()})
    }
}
