use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;

use super::error::PrepError;
use super::stations::{StationId, StationIndex};
use super::time_bins::{Tau, TimeDiscretizer, Weekday};
use super::trips::{self, RowCounts, RowPolicy, TripColumns};


pub type BinKey = (Tau, Weekday);
pub type OdPair = (StationId, StationId);

/// Passenger counts of admitted trips, keyed by time bin, day and station pair.  Bins and pairs
/// iterate in the order they were first seen.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct OdTables {
    od_counts: IndexMap<BinKey, IndexMap<OdPair, u64>>,
    bin_totals: IndexMap<BinKey, u64>,
    tau_totals: HashMap<Tau, u64>,
    // the distinct weekdays on which each tau was observed
    tau_days: HashMap<Tau, HashSet<Weekday>>,
    num_combinations: usize,
}

impl OdTables {
    pub fn new() -> OdTables {
        OdTables::default()
    }

    pub fn record(&mut self, tau: Tau, day: Weekday, origin: StationId, destination: StationId,
                  passengers: u32) {
        let passengers = passengers as u64;
        let pair_counts = self.od_counts.entry((tau, day)).or_insert_with(IndexMap::new);
        if !pair_counts.contains_key(&(origin, destination)) {
            self.num_combinations += 1;
        }
        *pair_counts.entry((origin, destination)).or_insert(0) += passengers;
        *self.bin_totals.entry((tau, day)).or_insert(0) += passengers;
        *self.tau_totals.entry(tau).or_insert(0) += passengers;
        self.tau_days.entry(tau).or_insert_with(HashSet::new).insert(day);
    }

    pub fn is_empty(&self) -> bool {
        self.od_counts.is_empty()
    }

    /// Passenger counts per station pair, for each (tau, day) bin.
    pub fn od_counts(&self) -> &IndexMap<BinKey, IndexMap<OdPair, u64>> {
        &self.od_counts
    }

    pub fn bin_total(&self, key: &BinKey) -> u64 {
        self.bin_totals.get(key).copied().unwrap_or(0)
    }

    pub fn tau_total(&self, tau: Tau) -> u64 {
        self.tau_totals.get(&tau).copied().unwrap_or(0)
    }

    /// Number of distinct weekdays on which `tau` was observed.
    pub fn num_days(&self, tau: Tau) -> usize {
        self.tau_days.get(&tau).map_or(0, |days| days.len())
    }

    /// Number of distinct (tau, day, origin, destination) combinations.
    pub fn num_combinations(&self) -> usize {
        self.num_combinations
    }
}


/// Builds the OD count tables in one pass over a cleaned trip file.
pub struct OdFrequencyAggregator<'a> {
    index: &'a StationIndex,
    disc: &'a TimeDiscretizer,
    columns: &'a TripColumns,
    policy: RowPolicy,
}

impl<'a> OdFrequencyAggregator<'a> {
    pub fn new(index: &'a StationIndex, disc: &'a TimeDiscretizer, columns: &'a TripColumns,
               policy: RowPolicy) -> OdFrequencyAggregator<'a> {
        OdFrequencyAggregator {index, disc, columns, policy}
    }

    pub fn aggregate_file(&self, path: &Path) -> Result<(OdTables, RowCounts), PrepError> {
        log::info!("Extracting frequencies from {:?}", path);
        let mut tables = OdTables::new();
        let counts = trips::scan_trip_rows(path, self.policy, |record| {
            // parse everything before touching the tables
            let pickup_time = self.columns.pickup_time(record, self.disc)?;
            let passengers = self.columns.passenger_count(record)?;
            let (pickup, dropoff) = self.columns.endpoints(record)?;
            let stations = self.index.nearest_batch(&[pickup, dropoff])?;
            let (tau, day) = self.disc.discretize(&pickup_time);
            tables.record(tau, day, stations[0], stations[1], passengers);
            Ok(())
        })?;

        log::info!("Aggregated {} trips into {} (tau, day, origin, destination) combinations",
                   counts.used, tables.num_combinations());
        Ok((tables, counts))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2d;
    use crate::stations::StationSet;
    use crate::test_utils::{trip_line, write_trips, TRIP_HEADER};
    use tempfile::tempdir;

    fn check_invariants(tables: &OdTables) {
        for (key, pairs) in &tables.od_counts {
            assert!(!pairs.is_empty());
            assert_eq!(tables.bin_totals[key], pairs.values().sum::<u64>());
        }
        assert_eq!(tables.bin_totals.len(), tables.od_counts.len());
        for (tau, total) in &tables.tau_totals {
            let bins_sum: u64 = tables.bin_totals.iter().filter(|((tt, _), _)| tt == tau)
                                                 .map(|(_, count)| count).sum();
            assert_eq!(*total, bins_sum);
            assert!(!tables.tau_days[tau].is_empty());
        }
        let num_combinations: usize = tables.od_counts.values().map(|pairs| pairs.len()).sum();
        assert_eq!(tables.num_combinations, num_combinations);
    }

    #[test]
    fn test_record() {
        let mut tables = OdTables::new();
        tables.record(10, 2, 0, 1, 2);
        tables.record(10, 2, 0, 1, 3);
        tables.record(10, 2, 1, 0, 1);
        tables.record(4, 2, 0, 0, 1);
        tables.record(10, 5, 0, 1, 4);
        check_invariants(&tables);

        let keys: Vec<&BinKey> = tables.od_counts.keys().collect();
        assert_eq!(keys, vec![&(10, 2), &(4, 2), &(10, 5)]);
        let pairs: Vec<(&OdPair, &u64)> = tables.od_counts[&(10, 2)].iter().collect();
        assert_eq!(pairs, vec![(&(0, 1), &5), (&(1, 0), &1)]);
        assert_eq!(tables.bin_totals[&(10, 2)], 6);
        assert_eq!(tables.tau_totals[&10], 10);
        assert_eq!(tables.tau_days[&10], vec![2, 5].into_iter().collect::<HashSet<Weekday>>());
        assert_eq!(tables.num_combinations, 4);
    }

    #[test]
    fn test_aggregate_file() -> Result<(), PrepError> {
        let dir = tempdir().unwrap();
        let stations = StationSet::from_positions(vec![
            Point2d::new(0., 0.), Point2d::new(10., 10.), Point2d::new(0., 10.)]);
        let index = StationIndex::new(&stations)?;
        let disc = TimeDiscretizer::default();
        let columns = TripColumns::default();

        let wed = "2014-01-01 02:35:00";
        let thu = "2014-01-02 02:40:00";
        let path = write_trips(dir.path(), "cleaned.csv", &vec![
            trip_line("M1", wed, wed, "2", (0.1, 0.2), (9.8, 9.9)),
            trip_line("M2", wed, wed, "3", (-0.3, 0.4), (10.2, 9.5)),
            trip_line("M3", wed, wed, "x", (-0.3, 0.4), (10.2, 9.5)),
            trip_line("M4", "bad time", wed, "1", (-0.3, 0.4), (10.2, 9.5)),
            String::from("M7,H7,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:35:00,1,600,1.0,\
                          -0.3,north,10.2,9.5"),
            trip_line("M5", wed, wed, "1", (0.5, 9.), (0.2, 0.1)),
            trip_line("M6", thu, thu, "4", (0.1, 0.2), (9.8, 9.9)),
        ]);

        let aggregator = OdFrequencyAggregator::new(&index, &disc, &columns, RowPolicy::Skip);
        let (tables, counts) = aggregator.aggregate_file(&path)?;
        check_invariants(&tables);
        assert_eq!(counts, RowCounts {used: 4, skipped: 3});
        assert_eq!(tables.od_counts[&(10, 2)][&(0, 1)], 5);
        assert_eq!(tables.od_counts[&(10, 2)][&(2, 0)], 1);
        assert_eq!(tables.od_counts[&(10, 3)][&(0, 1)], 4);
        assert_eq!(tables.tau_totals[&10], 10);
        assert_eq!(tables.tau_days[&10].len(), 2);

        assert_eq!(tables.num_combinations(), 3);
        assert_eq!(tables.bin_total(&(10, 2)), 6);
        assert_eq!(tables.bin_total(&(11, 2)), 0);
        assert_eq!(tables.num_days(10), 2);

        let failing = OdFrequencyAggregator::new(&index, &disc, &columns, RowPolicy::Fail);
        assert!(failing.aggregate_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_aggregate_file_with_bad_bytes() -> Result<(), PrepError> {
        let dir = tempdir().unwrap();
        let stations = StationSet::from_positions(vec![
            Point2d::new(0., 0.), Point2d::new(10., 10.)]);
        let index = StationIndex::new(&stations)?;
        let disc = TimeDiscretizer::default();
        let columns = TripColumns::default();

        let mut contents = format!("{}\n", TRIP_HEADER).into_bytes();
        contents.extend_from_slice(
            b"M1,H1,V\xe9S,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,2,600,1.0,0.1,0.2,9.8,9.9\n");
        contents.extend_from_slice(
            b"M2,H2,VTS,1,N,2014-01-01 02:35:00,2014-01-01 02:50:00,1,600,1.0,0.1,\xff,9.8,9.9\n");
        contents.extend_from_slice(
            b"M3,H3,VTS,1,N,2014-01-01 02:40:00,2014-01-01 02:50:00,3,600,1.0,0.1,0.2,9.8,9.9\n");
        let path = dir.path().join("cleaned.csv");
        std::fs::write(&path, contents).unwrap();

        let aggregator = OdFrequencyAggregator::new(&index, &disc, &columns, RowPolicy::Skip);
        let (tables, counts) = aggregator.aggregate_file(&path)?;
        assert_eq!(counts, RowCounts {used: 2, skipped: 1});
        assert_eq!(tables.od_counts()[&(10, 2)][&(0, 1)], 5);
        Ok(())
    }
}
