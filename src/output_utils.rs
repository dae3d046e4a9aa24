use std::fs::File;
use std::path::Path;

use super::error::PrepError;


/// Formats a float in its shortest round-trip form, always keeping a decimal point so that
/// integral values read as floats downstream (1.0 rather than 1).
pub fn fmt_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0. {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Creates a csv writer at `path`, creating missing parent directories.  Records may have
/// differing lengths, since several outputs start with a lone count line.
pub fn create_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<File>, PrepError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| PrepError::io(parent, err))?;
        }
    }
    let file = File::create(path).map_err(|err| PrepError::io(path, err))?;
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(file))
}
