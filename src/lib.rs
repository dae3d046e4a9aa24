// imports of other modules from this crate
mod error;
pub use error::PrepError;

mod geometry;
pub use geometry::{Point2d, ServiceArea};

mod time_bins;
pub use time_bins::{DemandGroupKey, Tau, TimeDiscretizer, Weekday, BINS_PER_DAY,
                    DEFAULT_DATE_FORMAT};

mod trips;
pub use trips::{RowCounts, RowPolicy, TripColumns, TripRecord};

mod stations;
pub use stations::{Station, StationId, StationIndex, StationSet};

mod cleaning;
pub use cleaning::{clean_file, sample_days, CleaningSummary, DaySample};

mod aggregation;
pub use aggregation::{OdFrequencyAggregator, OdTables};

mod probabilities;
pub use probabilities::{build_probability_tables, FrequencyRecord, ProbabilityRecord,
                        ProbabilityTables};

mod demands;
pub use demands::{check_file_template, demand_file_name, DemandFile, DemandGrouping,
                  DemandPartitioner, DemandRecord, DEFAULT_DEMAND_FILE_TEMPLATE};

mod pipeline;
pub use pipeline::{run_pipeline, DaySampleConfig, PrepConfig, PrepSummary};

mod config_utils;
mod output_utils;

#[cfg(test)]
mod test_utils;
