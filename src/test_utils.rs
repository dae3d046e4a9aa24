use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};


pub const TRIP_HEADER: &str = "medallion,hack_license,vendor_id,rate_code,store_and_fwd_flag,\
    pickup_datetime,dropoff_datetime,passenger_count,trip_time_in_secs,trip_distance,\
    pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude";

/// Writes `contents` to a new file in `dir` and returns its path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

/// Builds a raw trip row in the default column layout.
pub fn trip_line(vehicle: &str, pickup_time: &str, dropoff_time: &str, passengers: &str,
                 pickup: (f64, f64), dropoff: (f64, f64)) -> String {
    format!("{},H{},VTS,1,N,{},{},{},600,1.0,{},{},{},{}", vehicle, vehicle, pickup_time,
            dropoff_time, passengers, pickup.0, pickup.1, dropoff.0, dropoff.1)
}

/// Writes a trip file with the standard header followed by `lines`.
pub fn write_trips(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let mut contents = String::from(TRIP_HEADER);
    contents.push('\n');
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    write_file(dir, name, &contents)
}
