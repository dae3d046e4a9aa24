use std::path::{Path, PathBuf};

use yaml_rust::Yaml;

use super::error::PrepError;
use super::geometry::Point2d;


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

pub fn get_str<'y>(yaml_cfg: &'y Yaml, key: &str) -> Result<&'y str, PrepError> {
    yaml_cfg[key].as_str()
        .ok_or_else(|| PrepError::Config(format!("no string value for {:?}", key)))
}

pub fn get_opt_str<'y>(yaml_cfg: &'y Yaml, key: &str) -> Result<Option<&'y str>, PrepError> {
    if yaml_cfg[key].is_badvalue() || yaml_cfg[key].is_null() {
        return Ok(None);
    }
    get_str(yaml_cfg, key).map(Some)
}

pub fn get_path(yaml_cfg: &Yaml, key: &str, config_dir: &Path) -> Result<PathBuf, PrepError> {
    Ok(str_to_absolute_path(get_str(yaml_cfg, key)?, config_dir))
}

pub fn get_usize(yaml_cfg: &Yaml, key: &str) -> Result<usize, PrepError> {
    match yaml_cfg[key].as_i64() {
        Some(value) if value >= 0 => Ok(value as usize),
        _ => Err(PrepError::Config(format!("no non-negative integer value for {:?}", key))),
    }
}

/// yaml-rust only gives f64s for values written with a decimal point.
pub fn yaml_as_f64(value: &Yaml) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|ii| ii as f64))
}

/// Parses a list of `[x, y]` pairs.
pub fn get_points(yaml_cfg: &Yaml, key: &str) -> Result<Vec<Point2d>, PrepError> {
    let bad_point = || PrepError::Config(format!("{:?} must be a list of [x, y] pairs", key));
    let items = yaml_cfg[key].as_vec().ok_or_else(bad_point)?;
    let mut points = vec![];
    for item in items {
        match item.as_vec().map(|pair| pair.as_slice()) {
            Some([xx, yy]) => {
                let xx = yaml_as_f64(xx).ok_or_else(bad_point)?;
                let yy = yaml_as_f64(yy).ok_or_else(bad_point)?;
                points.push(Point2d::new(xx, yy));
            }
            _ => return Err(bad_point()),
        }
    }
    Ok(points)
}
