//! Engine configuration
//!
//! Every tunable of the route pipeline lives here so the editor front end can load it from a
//! file or override single values from the command line.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One rung of the weight ladder: points surviving `tolerance` get at least `weight`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightStep {
    pub weight: u8,
    /// Douglas-Peucker tolerance in degrees
    pub tolerance: f64,
}

impl WeightStep {
    pub const fn new(weight: u8, tolerance: f64) -> Self {
        Self { weight, tolerance }
    }
}

/// Configuration for the route engine
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Weight ladder, ordered by ascending tolerance.
    /// Default: {2: 1e-5, 3: 1.5e-5, 5: 5e-5, 7: 2e-4, 9: 5e-4, 10: 7e-4}
    pub weight_ladder: Vec<WeightStep>,
    /// Weight of points no tolerance retained (default 1)
    pub base_weight: u8,
    /// Weight of course controls and user-pinned points; never dropped (default 20)
    pub pinned_weight: u8,
    /// Multiplier applied to every geodesic segment to match reference devices (default 1.0013)
    pub distance_correction: f64,
    /// Grade change above which a point's altitude is treated as an outlier (default 0.3)
    ///
    /// Compared against `|pre_slope + post_slope|`. `post_slope` is stored negated, so the sum
    /// is the incoming grade minus the outgoing grade; a steady climb scores zero.
    pub outlier_slope_threshold: f64,
    /// Altitude scale of the import/export polyline (default 1000, millimeters)
    pub altitude_scale: u32,
    /// Decimal places two coordinates must share to be considered the same point (default 5)
    pub coincidence_decimals: u32,
    /// Elevation service settings
    pub elevation: ElevationConfig,
    /// DEM tile priming settings
    pub tiles: TileConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_ladder: vec![
                WeightStep::new(2, 0.000_01),
                WeightStep::new(3, 0.000_015),
                WeightStep::new(5, 0.000_05),
                WeightStep::new(7, 0.000_2),
                WeightStep::new(9, 0.000_5),
                WeightStep::new(10, 0.000_7),
            ],
            base_weight: 1,
            pinned_weight: 20,
            distance_correction: 1.0013,
            outlier_slope_threshold: 0.3,
            altitude_scale: crate::polyline::DEFAULT_ALTITUDE_SCALE,
            coincidence_decimals: 5,
            elevation: ElevationConfig::default(),
            tiles: TileConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Highest weight the ladder can grant
    pub fn max_ladder_weight(&self) -> u8 {
        self.weight_ladder
            .iter()
            .map(|step| step.weight)
            .max()
            .unwrap_or(self.base_weight)
    }
}

/// Elevation service settings
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ElevationConfig {
    /// Uncorrected points submitted per resolution round (default 200)
    pub max_points_per_request: usize,
    /// Points per service call, further capped by the service's own limit (default 40)
    pub batch_size: usize,
    /// Time allowed for one service call before it counts as a retryable failure (default 10s)
    pub timeout: Duration,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            max_points_per_request: 200,
            batch_size: 40,
            timeout: Duration::from_secs(10),
        }
    }
}

/// DEM tile priming settings
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TileConfig {
    /// Web Mercator zoom level of the DEM tiles (default 12)
    pub zoom: u8,
    /// Attempts per tile before giving up (default 4)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each further retry (default 250ms)
    pub base_backoff: Duration,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            zoom: 12,
            max_attempts: 4,
            base_backoff: Duration::from_millis(250),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_is_ascending() {
        let config = EngineConfig::default();
        for pair in config.weight_ladder.windows(2) {
            assert!(pair[0].tolerance < pair[1].tolerance);
            assert!(pair[0].weight < pair[1].weight);
        }
    }

    #[test]
    fn test_pinned_weight_above_ladder() {
        let config = EngineConfig::default();
        assert_eq!(config.max_ladder_weight(), 10);
        assert!(config.pinned_weight > config.max_ladder_weight());
    }

    #[test]
    fn test_empty_ladder_falls_back_to_base() {
        let config = EngineConfig {
            weight_ladder: Vec::new(),
            ..EngineConfig::default()
        };
        assert_eq!(config.max_ladder_weight(), config.base_weight);
    }
}
