/// Naming/path resolver
///
/// Pure mapping from project metadata to the relative on-disk path of one
/// captured image. No I/O here; the storage manager joins the result onto
/// whichever root it is writing.
///
/// Layout contract (bit-exact):
/// `{project}/{borehole}/{borehole}-{from}-{to}-{1|2}.jpg`
/// with depths rendered to two decimals and the decimal point replaced by an
/// underscore, e.g. `Geo Proj_1/BH_01/BH_01-0_00-0_50-1.jpg`.
use std::path::PathBuf;

use crate::camera::CameraId;
use crate::error::{CoreError, Result};

/// Characters that may not appear in a path segment.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Resolve the relative path for one camera's image of one interval.
pub fn resolve(
    project: &str,
    borehole: &str,
    from_m: f64,
    to_m: f64,
    camera: CameraId,
) -> Result<PathBuf> {
    let project = sanitize(project)?;
    let borehole = sanitize(borehole)?;
    let from = format_depth(from_m)?;
    let to = format_depth(to_m)?;

    let filename = format!("{borehole}-{from}-{to}-{}.jpg", camera.number());
    Ok(PathBuf::from(project).join(borehole).join(filename))
}

/// Replace filesystem-illegal characters with underscores and trim
/// whitespace and dots. A name that sanitizes to nothing is an input error.
pub fn sanitize(name: &str) -> Result<String> {
    let cleaned: String = name
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if cleaned.is_empty() {
        return Err(CoreError::validation(format!(
            "name {name:?} is empty after removing illegal characters"
        )));
    }
    Ok(cleaned.to_string())
}

/// Render a depth with exactly two decimals, decimal point as underscore.
/// `0.50` becomes `0_50`. Negative depths are rejected independently of the
/// interval invariant.
fn format_depth(meters: f64) -> Result<String> {
    if meters < 0.0 {
        return Err(CoreError::validation(format!(
            "depth {meters} is negative"
        )));
    }
    Ok(format!("{meters:.2}").replace('.', "_"))
}
