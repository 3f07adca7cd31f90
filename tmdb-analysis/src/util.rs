use std::cmp;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// The file extension of raw movie documents.
pub const JSON_EXTENSION: &str = "json";

/// A type that provides a Display impl for std::time::Duration.
#[derive(Debug)]
pub struct NiceDuration(pub time::Duration);

impl fmt::Display for NiceDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:0.4} secs", self.fractional_seconds())
    }
}

impl NiceDuration {
    /// Create a duration corresponding to the amount of time since the
    /// instant given.
    pub fn since(t: time::Instant) -> NiceDuration {
        NiceDuration(time::Instant::now().duration_since(t))
    }

    /// Returns the number of seconds in this duration in fraction form.
    /// The number to the left of the decimal point is the number of seconds,
    /// and the number to the right is the number of milliseconds.
    pub fn fractional_seconds(&self) -> f64 {
        let fractional = (self.0.subsec_nanos() as f64) / 1_000_000_000.0;
        self.0.as_secs() as f64 + fractional
    }
}

/// Returns every JSON file directly inside `dir`, sorted by file name.
///
/// The sort order is what defines "input order" for a directory, so that
/// deduplication and tie-breaking are reproducible across runs.
pub fn json_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = vec![];
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));
    for result in walker {
        let dent = result.map_err(|e| {
            let err = e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walk error")
            });
            Error::io_path(err, dir)
        })?;
        let is_json = dent
            .path()
            .extension()
            .map_or(false, |ext| ext == JSON_EXTENSION);
        if dent.file_type().is_file() && is_json {
            paths.push(dent.into_path());
        }
    }
    Ok(paths)
}

/// Reads the entire contents of a file into a string.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io_path(e, path))
}

/// A running sum over values that may be missing.
///
/// Missing values are ignored, and a sum or mean over nothing but missing
/// values is itself missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    /// Add a value, if it exists.
    pub fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// Returns the sum of all values added so far.
    pub fn sum(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum)
        }
    }

    /// Returns the mean of all values added so far.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Returns the smallest value `v` in `values` such that at least a fraction
/// `p` of all values are less than or equal to `v`.
///
/// This always returns one of the given values (no interpolation), and so
/// the median of an even number of values is the lower of the two middle
/// values. `values` need not be sorted.
pub fn percentile_nearest(values: &mut [f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = (p * values.len() as f64).ceil() as usize;
    let i = cmp::min(values.len() - 1, rank.saturating_sub(1));
    Some(values[i])
}

/// Returns the `p`th percentile of `values` by linear interpolation between
/// the closest ranks. `values` must be sorted in ascending order.
pub fn percentile_interpolated(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Returns the sample standard deviation of the given values.
///
/// This is undefined for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((ss / (n - 1.0)).sqrt())
}

/// Returns the Pearson correlation coefficient of the given pairs.
///
/// This is undefined when there are fewer than two pairs or when either side
/// has no variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x) * (x - mean_x);
        var_y += (y - mean_y) * (y - mean_y);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}
