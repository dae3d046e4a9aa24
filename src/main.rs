use env_logger;
use taxi_demand_prep::{run_pipeline, PrepConfig};


fn main() {
    env_logger::init();
    let config_path = std::env::args().nth(1).unwrap_or_else(|| String::from("config.yaml"));
    let cfg = match PrepConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            log::error!("Failed to load config {}: {}", config_path, err);
            std::process::exit(1);
        }
    };

    match run_pipeline(&cfg) {
        Ok(summary) => {
            println!("Taxi count: {}", summary.vehicle_count);
            println!("Demand files written: {}", summary.demand_files.len());
        }
        Err(err) => {
            log::error!("Pipeline failed: {}", err);
            std::process::exit(1);
        }
    }
}
