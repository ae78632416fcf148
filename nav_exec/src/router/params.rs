//! # Router parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{cog_map::CognitiveMapMode, sensors::SensorParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the router, loaded from `router.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterParams {
    /// What agents know of the building when they first ask for a route
    pub cognitive_map_mode: CognitiveMapMode,

    pub sensors: SensorParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            cognitive_map_mode: CognitiveMapMode::Complete,
            sensors: SensorParams::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hazard::HazardQuantity;

    #[test]
    fn test_sensor_table() {
        let params: RouterParams = util::params::from_str(
            "cognitive_map_mode = \"Progressive\"\n\
             [sensors]\n\
             jam = false\n\
             hazard_quantity = \"Toxicity\"\n",
        )
        .unwrap();

        assert_eq!(params.cognitive_map_mode, CognitiveMapMode::Progressive);
        assert!(!params.sensors.jam);
        assert!(params.sensors.discover_doors);
        assert_eq!(params.sensors.hazard_quantity, HazardQuantity::Toxicity);
        assert_eq!(params.sensors.jam_stationary_weight, 100.0);
    }
}
