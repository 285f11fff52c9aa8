/// Depth intervals and the progression policy
///
/// One interval describes the core segment currently under the cameras.
/// After a successful save the interval advances so the next segment starts
/// where this one ended; between captures the operator may trim or extend
/// the end of the interval in configured steps.
use crate::error::{CoreError, Result};

/// A depth-from/depth-to pair in meters. `to_m > from_m` and `from_m >= 0`
/// hold for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthInterval {
    from_m: f64,
    to_m: f64,
}

/// Snap to two decimals, the precision everything downstream renders.
fn round2(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

impl DepthInterval {
    pub fn new(from_m: f64, to_m: f64) -> Result<Self> {
        let from_m = round2(from_m);
        let to_m = round2(to_m);
        if from_m < 0.0 {
            return Err(CoreError::validation(format!(
                "depth from {from_m:.2}m is negative"
            )));
        }
        if to_m <= from_m {
            return Err(CoreError::validation(format!(
                "depth to {to_m:.2}m must be greater than depth from {from_m:.2}m"
            )));
        }
        Ok(Self { from_m, to_m })
    }

    /// Initial interval at the top of the hole.
    pub fn starting(segment_length: f64) -> Result<Self> {
        Self::new(0.0, segment_length)
    }

    pub fn from_m(&self) -> f64 {
        self.from_m
    }

    pub fn to_m(&self) -> f64 {
        self.to_m
    }

    /// Next interval after a successful save: starts where this one ended
    /// and spans one segment length.
    pub fn advanced(&self, segment_length: f64) -> Self {
        Self {
            from_m: self.to_m,
            to_m: round2(self.to_m + segment_length),
        }
    }

    /// Adjust only the end of the interval by `delta` meters.
    ///
    /// An adjustment that would leave `to_m <= from_m` (or that is not
    /// finite) is rejected and the prior value retained.
    pub fn adjust_to(&mut self, delta: f64) -> Result<()> {
        let candidate = round2(self.to_m + delta);
        if !candidate.is_finite() || candidate <= self.from_m {
            return Err(CoreError::validation(format!(
                "depth to {candidate:.2}m must stay above depth from {:.2}m",
                self.from_m
            )));
        }
        self.to_m = candidate;
        Ok(())
    }
}

impl std::fmt::Display for DepthInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}m - {:.2}m", self.from_m, self.to_m)
    }
}
