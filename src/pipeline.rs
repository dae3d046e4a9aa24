use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use yaml_rust::{Yaml, YamlLoader};

use super::aggregation::OdFrequencyAggregator;
use super::cleaning::{self, DaySample};
use super::config_utils;
use super::demands::{self, DemandFile, DemandGrouping, DemandPartitioner,
                     DEFAULT_DEMAND_FILE_TEMPLATE};
use super::error::PrepError;
use super::geometry::{Point2d, ServiceArea};
use super::probabilities::build_probability_tables;
use super::stations::{StationIndex, StationSet};
use super::time_bins::{TimeDiscretizer, Weekday, DEFAULT_DATE_FORMAT};
use super::trips::{RowPolicy, TripColumns};


#[derive(PartialEq, Debug, Clone)]
pub struct DaySampleConfig {
    pub sample: DaySample,
    // where the sampled rows are written before cleaning
    pub sampled_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PrepConfig {
    // csv file of raw trips
    pub raw_path: PathBuf,
    // headerless csv of `id,lon,lat` station nodes
    pub nodes_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub stations_path: PathBuf,
    pub probabilities_path: PathBuf,
    pub frequencies_path: PathBuf,
    pub demands_dir: PathBuf,
    pub demand_file_template: String,
    pub service_area: Vec<Point2d>,
    pub date_format: String,
    // timezone the trip timestamps are in
    pub timezone: Tz,
    pub malformed_rows: RowPolicy,
    pub demand_grouping: DemandGrouping,
    pub columns: TripColumns,
    pub day_sample: Option<DaySampleConfig>,
}

impl PrepConfig {
    pub fn from_file(path: &str) -> Result<PrepConfig, PrepError> {
        let file_contents = std::fs::read_to_string(path).map_err(|err| PrepError::io(path, err))?;
        let yaml_cfgs = YamlLoader::load_from_str(&file_contents)?;
        let yaml_cfg = yaml_cfgs.get(0)
            .ok_or_else(|| PrepError::Config(format!("{:?} is empty", path)))?;
        let config_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        PrepConfig::from_yaml(yaml_cfg, config_dir)
    }

    /// Relative paths in the config are taken relative to `config_dir`.
    pub fn from_yaml(yaml_cfg: &Yaml, config_dir: &Path) -> Result<PrepConfig, PrepError> {
        let timezone = match config_utils::get_opt_str(yaml_cfg, "timezone")? {
            Some(name) => name.parse::<Tz>()
                .map_err(|err| PrepError::Config(format!("bad timezone {:?}: {}", name, err)))?,
            None => Tz::UTC,
        };

        let malformed_rows = match config_utils::get_opt_str(yaml_cfg, "malformed_rows")? {
            Some(policy) => policy.parse::<RowPolicy>()?,
            None => RowPolicy::Skip,
        };

        let demand_grouping = match config_utils::get_opt_str(yaml_cfg, "demand_grouping")? {
            Some(grouping) => grouping.parse::<DemandGrouping>()?,
            None => DemandGrouping::Buffered,
        };

        let columns = if yaml_cfg["columns"].is_badvalue() {
            TripColumns::default()
        } else {
            parse_columns(&yaml_cfg["columns"])?
        };

        let day_sample = if yaml_cfg["day_sample"].is_badvalue() {
            None
        } else {
            let sample_cfg = &yaml_cfg["day_sample"];
            let weekdays: HashSet<Weekday> = match sample_cfg["weekdays"].as_vec() {
                Some(days) => days.iter().map(|dd| match dd.as_i64() {
                    Some(day) if (0..7).contains(&day) => Ok(day as u32),
                    _ => Err(PrepError::Config(format!("bad weekday {:?}", dd))),
                }).collect::<Result<HashSet<Weekday>, PrepError>>()?,
                None => (0..7).collect(),
            };
            Some(DaySampleConfig {
                sample: DaySample {
                    weekdays,
                    max_days: config_utils::get_usize(sample_cfg, "max_days")?,
                },
                sampled_path: config_utils::get_path(sample_cfg, "sampled_path", config_dir)?,
            })
        };

        let demand_file_template = String::from(
            config_utils::get_opt_str(yaml_cfg, "demand_file_template")?
                .unwrap_or(DEFAULT_DEMAND_FILE_TEMPLATE));
        demands::check_file_template(&demand_file_template)?;

        Ok(PrepConfig {
            raw_path: config_utils::get_path(yaml_cfg, "raw_path", config_dir)?,
            nodes_path: config_utils::get_path(yaml_cfg, "nodes_path", config_dir)?,
            cleaned_path: config_utils::get_path(yaml_cfg, "cleaned_path", config_dir)?,
            stations_path: config_utils::get_path(yaml_cfg, "stations_path", config_dir)?,
            probabilities_path: config_utils::get_path(yaml_cfg, "probabilities_path",
                                                       config_dir)?,
            frequencies_path: config_utils::get_path(yaml_cfg, "frequencies_path", config_dir)?,
            demands_dir: config_utils::get_path(yaml_cfg, "demands_dir", config_dir)?,
            demand_file_template,
            service_area: config_utils::get_points(yaml_cfg, "service_area")?,
            date_format: String::from(config_utils::get_opt_str(yaml_cfg, "date_format")?
                                          .unwrap_or(DEFAULT_DATE_FORMAT)),
            timezone,
            malformed_rows,
            demand_grouping,
            columns,
            day_sample,
        })
    }

    pub fn discretizer(&self) -> TimeDiscretizer {
        TimeDiscretizer::new(&self.date_format, self.timezone)
    }
}

fn parse_columns(yaml_cfg: &Yaml) -> Result<TripColumns, PrepError> {
    let defaults = TripColumns::default();
    let column = |key: &str, default: usize| -> Result<usize, PrepError> {
        if yaml_cfg[key].is_badvalue() {
            Ok(default)
        } else {
            config_utils::get_usize(yaml_cfg, key)
        }
    };
    Ok(TripColumns {
        vehicle_id: column("vehicle_id", defaults.vehicle_id)?,
        pickup_datetime: column("pickup_datetime", defaults.pickup_datetime)?,
        dropoff_datetime: column("dropoff_datetime", defaults.dropoff_datetime)?,
        passenger_count: column("passenger_count", defaults.passenger_count)?,
        pickup_longitude: column("pickup_longitude", defaults.pickup_longitude)?,
        pickup_latitude: column("pickup_latitude", defaults.pickup_latitude)?,
        dropoff_longitude: column("dropoff_longitude", defaults.dropoff_longitude)?,
        dropoff_latitude: column("dropoff_latitude", defaults.dropoff_latitude)?,
    })
}


#[derive(PartialEq, Debug, Clone, Default)]
pub struct PrepSummary {
    /// Distinct vehicles among the admitted trips.
    pub vehicle_count: usize,
    pub admitted_rows: u64,
    pub rejected_rows: u64,
    pub aggregated_rows: u64,
    /// Rows dropped as malformed by the sampling, aggregation and demand passes combined.
    pub skipped_rows: u64,
    pub num_od_combinations: usize,
    pub num_stations: usize,
    pub demand_files: Vec<DemandFile>,
}

/// Runs every stage, from the raw trip file to the simulator input files.
pub fn run_pipeline(cfg: &PrepConfig) -> Result<PrepSummary, PrepError> {
    let disc = cfg.discretizer();
    let area = ServiceArea::new(&cfg.service_area)?;
    demands::check_file_template(&cfg.demand_file_template)?;

    let mut summary = PrepSummary::default();
    let raw_path = match &cfg.day_sample {
        Some(sample_cfg) => {
            let counts = cleaning::sample_days(&cfg.raw_path, &sample_cfg.sampled_path,
                                               &sample_cfg.sample, &cfg.columns, &disc,
                                               cfg.malformed_rows)?;
            summary.skipped_rows += counts.skipped;
            sample_cfg.sampled_path.clone()
        }
        None => cfg.raw_path.clone(),
    };

    let cleaning = cleaning::clean_file(&raw_path, &cfg.cleaned_path, &area, &cfg.columns)?;
    summary.vehicle_count = cleaning.vehicle_count;
    summary.admitted_rows = cleaning.admitted;
    summary.rejected_rows = cleaning.rejected;
    log::info!("Taxi count: {}", cleaning.vehicle_count);

    let stations = StationSet::from_nodes_csv(&cfg.nodes_path)?;
    let index = StationIndex::new(&stations)?;
    summary.num_stations = stations.len();
    stations.write_catalog(&cfg.stations_path)?;

    let aggregator = OdFrequencyAggregator::new(&index, &disc, &cfg.columns, cfg.malformed_rows);
    let (tables, counts) = aggregator.aggregate_file(&cfg.cleaned_path)?;
    if tables.is_empty() {
        log::warn!("No trips were aggregated; the probability tables will be empty");
    }
    summary.aggregated_rows = counts.used;
    summary.skipped_rows += counts.skipped;
    summary.num_od_combinations = tables.num_combinations();

    log::info!("Creating probability and frequency files");
    let prob_tables = build_probability_tables(tables);
    prob_tables.write_probabilities(&cfg.probabilities_path)?;
    prob_tables.write_frequencies(&cfg.frequencies_path)?;

    let partitioner = DemandPartitioner::new(&index, &disc, &cfg.columns, cfg.malformed_rows,
                                             cfg.demand_grouping, &cfg.demands_dir,
                                             &cfg.demand_file_template);
    let (demand_files, counts) = partitioner.partition_file(&cfg.cleaned_path)?;
    summary.skipped_rows += counts.skipped;
    summary.demand_files = demand_files;

    log::info!("Done: {} demand files, {} OD combinations", summary.demand_files.len(),
               summary.num_od_combinations);
    Ok(summary)
}
