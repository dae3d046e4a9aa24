use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use csv::{ByteRecord, StringRecord};

use super::error::PrepError;
use super::geometry::Point2d;
use super::time_bins::TimeDiscretizer;


/// Positions of the fields we use in a raw trip row.  The defaults follow the layout of the
/// NYC taxi trip_data files.
#[derive(PartialEq, Debug, Clone)]
pub struct TripColumns {
    pub vehicle_id: usize,
    pub pickup_datetime: usize,
    pub dropoff_datetime: usize,
    pub passenger_count: usize,
    pub pickup_longitude: usize,
    pub pickup_latitude: usize,
    pub dropoff_longitude: usize,
    pub dropoff_latitude: usize,
}

impl Default for TripColumns {
    fn default() -> TripColumns {
        TripColumns {
            vehicle_id: 0,
            pickup_datetime: 5,
            dropoff_datetime: 6,
            passenger_count: 7,
            pickup_longitude: 10,
            pickup_latitude: 11,
            dropoff_longitude: 12,
            dropoff_latitude: 13,
        }
    }
}

impl TripColumns {
    pub fn vehicle_id<'r>(&self, record: &'r StringRecord) -> Result<&'r str, PrepError> {
        field(record, self.vehicle_id, "vehicle id")
    }

    pub fn pickup_time(&self, record: &StringRecord, disc: &TimeDiscretizer)
                       -> Result<NaiveDateTime, PrepError> {
        disc.parse(field(record, self.pickup_datetime, "pickup datetime")?)
    }

    pub fn dropoff_time(&self, record: &StringRecord, disc: &TimeDiscretizer)
                        -> Result<NaiveDateTime, PrepError> {
        disc.parse(field(record, self.dropoff_datetime, "dropoff datetime")?)
    }

    pub fn passenger_count(&self, record: &StringRecord) -> Result<u32, PrepError> {
        parse_field(record, self.passenger_count, "passenger count")
    }

    /// Parses the pickup and dropoff positions.  Non-finite coordinates count as malformed.
    pub fn endpoints(&self, record: &StringRecord) -> Result<(Point2d, Point2d), PrepError> {
        let pickup = Point2d::new(
            parse_field(record, self.pickup_longitude, "pickup longitude")?,
            parse_field(record, self.pickup_latitude, "pickup latitude")?,
        );
        let dropoff = Point2d::new(
            parse_field(record, self.dropoff_longitude, "dropoff longitude")?,
            parse_field(record, self.dropoff_latitude, "dropoff latitude")?,
        );
        if !pickup.is_finite() || !dropoff.is_finite() {
            return Err(PrepError::MalformedRow {
                line: line_of(record),
                reason: String::from("non-finite coordinate"),
            });
        }
        Ok((pickup, dropoff))
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, PrepError> {
    match record.get(idx) {
        Some(value) => Ok(value.trim()),
        None => Err(PrepError::MalformedRow {
            line: line_of(record),
            reason: format!("no {} column (index {})", name, idx),
        }),
    }
}

fn parse_field<T: FromStr>(record: &StringRecord, idx: usize, name: &str)
                           -> Result<T, PrepError> {
    let value = field(record, idx, name)?;
    value.parse().map_err(|_| PrepError::MalformedRow {
        line: line_of(record),
        reason: format!("bad {} {:?}", name, value),
    })
}


/// One fully-parsed raw trip.
#[derive(PartialEq, Debug, Clone)]
pub struct TripRecord {
    pub vehicle_id: String,
    pub pickup_time: NaiveDateTime,
    pub dropoff_time: NaiveDateTime,
    pub passenger_count: u32,
    pub pickup: Point2d,
    pub dropoff: Point2d,
}

impl TripRecord {
    pub fn from_record(record: &StringRecord, columns: &TripColumns, disc: &TimeDiscretizer)
                       -> Result<TripRecord, PrepError> {
        let (pickup, dropoff) = columns.endpoints(record)?;
        Ok(TripRecord {
            vehicle_id: String::from(columns.vehicle_id(record)?),
            pickup_time: columns.pickup_time(record, disc)?,
            dropoff_time: columns.dropoff_time(record, disc)?,
            passenger_count: columns.passenger_count(record)?,
            pickup,
            dropoff,
        })
    }
}


/// What a pass over trip rows does with a row it can't parse.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RowPolicy {
    Skip,
    Fail,
}

impl FromStr for RowPolicy {
    type Err = PrepError;

    fn from_str(ss: &str) -> Result<RowPolicy, PrepError> {
        match ss {
            "skip" => Ok(RowPolicy::Skip),
            "fail" => Ok(RowPolicy::Fail),
            _ => Err(PrepError::Config(format!("unknown malformed row policy {:?}", ss))),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct RowCounts {
    pub used: u64,
    pub skipped: u64,
}


pub fn trip_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, PrepError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

/// Decodes a raw row for parsing.  Invalid UTF-8 is replaced rather than rejected, so a bad
/// byte only matters if it lands in a field we parse.
pub fn decode_record(raw: &ByteRecord) -> StringRecord {
    let mut record = StringRecord::from_byte_record_lossy(raw.clone());
    record.set_position(raw.position().cloned());
    record
}

/// Visits every data row of a trip file in order.  Row-level errors returned by `visit` are
/// counted and skipped or returned, according to `policy`; any other error ends the scan.
pub fn scan_trip_rows<F>(path: &Path, policy: RowPolicy, mut visit: F)
                         -> Result<RowCounts, PrepError>
    where F: FnMut(&StringRecord) -> Result<(), PrepError>
{
    let mut reader = trip_reader(path)?;
    let mut counts = RowCounts::default();
    let mut raw = ByteRecord::new();
    while reader.read_byte_record(&mut raw)? {
        let record = decode_record(&raw);
        match visit(&record) {
            Ok(()) => counts.used += 1,
            Err(err) if err.is_row_error() && policy == RowPolicy::Skip => {
                log::debug!("skipping row: {}", err);
                counts.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    if counts.skipped > 0 {
        log::warn!("skipped {} malformed rows of {:?}", counts.skipped, path);
    }
    Ok(counts)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_file, TRIP_HEADER};
    use tempfile::tempdir;

    fn record(line: &str) -> StringRecord {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        reader.records().next().unwrap().unwrap()
    }

    #[test]
    fn test_trip_parsing() {
        let row = record("M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,\
                          -73.98, 40.75,-73.95,40.78");
        let trip = TripRecord::from_record(&row, &TripColumns::default(),
                                           &TimeDiscretizer::default()).unwrap();
        let disc = TimeDiscretizer::default();
        assert_eq!(trip, TripRecord {
            vehicle_id: String::from("M1"),
            pickup_time: disc.parse("2014-01-01 02:35:00").unwrap(),
            dropoff_time: disc.parse("2014-01-01 02:50:00").unwrap(),
            passenger_count: 2,
            pickup: Point2d::new(-73.98, 40.75),
            dropoff: Point2d::new(-73.95, 40.78),
        });
    }

    #[test]
    fn test_malformed_fields() {
        let columns = TripColumns::default();
        let disc = TimeDiscretizer::default();
        let bad_rows = vec![
            "M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,abc,40.75,-73.95,40.78",
            "M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,-73.98,40.75,-73.95",
            "M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,x,900,1.5,-73.98,40.75,-73.95,40.78",
            "M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,-1,900,1.5,-73.98,40.75,-73.95,40.78",
            "M1,H1,VTS,1,N,yesterday,2014-01-01 02:50:00,2,900,1.5,-73.98,40.75,-73.95,40.78",
            "M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,inf,40.75,-73.95,40.78",
        ];
        for line in bad_rows {
            let err = TripRecord::from_record(&record(line), &columns, &disc).unwrap_err();
            assert!(err.is_row_error(), "{:?}", err);
        }
    }

    #[test]
    fn test_scan_policies() -> Result<(), PrepError> {
        let dir = tempdir().unwrap();
        let contents = format!("{}\n\
            M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,1,1,2,2\n\
            M2,H2,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,two,900,1.5,1,1,2,2\n\
            M3,H3,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,4,900,1.5,1,1,2,2\n",
            TRIP_HEADER);
        let path = write_file(dir.path(), "trips.csv", &contents);
        let columns = TripColumns::default();

        let mut total = 0;
        let counts = scan_trip_rows(&path, RowPolicy::Skip, |row| {
            total += columns.passenger_count(row)?;
            Ok(())
        })?;
        assert_eq!(counts, RowCounts {used: 2, skipped: 1});
        assert_eq!(total, 6);

        let result = scan_trip_rows(&path, RowPolicy::Fail, |row| {
            columns.passenger_count(row).map(|_| ())
        });
        match result {
            Err(PrepError::MalformedRow {line, ..}) => assert_eq!(line, 3),
            other => panic!("expected a malformed row error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_scan_survives_bad_bytes() -> Result<(), PrepError> {
        let dir = tempdir().unwrap();
        let mut contents = format!("{}\n", TRIP_HEADER).into_bytes();
        contents.extend_from_slice(
            b"M1,H1,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,900,1.5,1,1,2,2\n");
        // an unused column and then a used one hold invalid utf-8
        contents.extend_from_slice(
            b"M2,H2,V\xe9S,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,3,900,1.5,1,1,2,2\n");
        contents.extend_from_slice(
            b"M3,H3,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,\xff,900,1.5,1,1,2,2\n");
        contents.extend_from_slice(
            b"M4,H4,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,4,900,1.5,1,1,2,2\n");
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, contents).unwrap();
        let columns = TripColumns::default();

        let mut total = 0;
        let counts = scan_trip_rows(&path, RowPolicy::Skip, |row| {
            total += columns.passenger_count(row)?;
            Ok(())
        })?;
        assert_eq!(counts, RowCounts {used: 3, skipped: 1});
        assert_eq!(total, 9);

        let result = scan_trip_rows(&path, RowPolicy::Fail, |row| {
            columns.passenger_count(row).map(|_| ())
        });
        match result {
            Err(PrepError::MalformedRow {line, ..}) => assert_eq!(line, 4),
            other => panic!("expected a malformed row error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_scan_propagates_other_errors() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "trips.csv", &format!("{}\nM1\n", TRIP_HEADER));
        let result = scan_trip_rows(&path, RowPolicy::Skip, |_| Err(PrepError::EmptyIndex));
        assert!(matches!(result, Err(PrepError::EmptyIndex)));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("skip".parse::<RowPolicy>().unwrap(), RowPolicy::Skip);
        assert_eq!("fail".parse::<RowPolicy>().unwrap(), RowPolicy::Fail);
        assert!("ignore".parse::<RowPolicy>().is_err());
    }
}
