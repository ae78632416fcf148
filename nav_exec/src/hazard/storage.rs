//! # Hazard mesh storage
//!
//! Preloaded hazard meshes keyed by quantity, elevation, door and time. Elevations and times are
//! bucketed to integers on insertion and lookup, so keys compare exactly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, fmt, fs::File, path::Path};

use building_if::DoorUid;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::{
    sanitize, HazardError, HazardField, HazardMesh, HazardParams, HazardQuantity, HazardQuery,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Identifies one stored mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HazardKey {
    pub quantity: HazardQuantity,

    /// Elevation of the mesh slice in multiples of the elevation bucket size
    pub elevation_bucket: i32,

    /// Door the mesh was computed for, `None` for meshes valid for every door
    pub door: Option<DoorUid>,

    /// Time of the mesh in multiples of the update interval
    pub time_bucket: u32,
}

#[derive(Debug, Clone)]
pub struct HazardMeshStorage {
    params: HazardParams,

    meshes: BTreeMap<HazardKey, HazardMesh>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for HazardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at elevation bucket {}, time bucket {}",
            self.quantity, self.elevation_bucket, self.time_bucket
        )?;
        if let Some(door) = self.door {
            write!(f, ", door {}", door)?;
        }
        Ok(())
    }
}

impl HazardMeshStorage {
    pub fn new(params: HazardParams) -> Self {
        Self {
            params,
            meshes: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &HazardParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// The key a mesh of the given slice elevation and time is stored under.
    pub fn key(
        &self,
        quantity: HazardQuantity,
        elevation_m: f64,
        door: Option<DoorUid>,
        time_s: f64,
    ) -> HazardKey {
        HazardKey {
            quantity,
            elevation_bucket: self.elevation_bucket(elevation_m),
            door,
            time_bucket: self.time_bucket(time_s),
        }
    }

    /// Store a mesh, replacing any mesh with the same key.
    pub fn insert(
        &mut self,
        quantity: HazardQuantity,
        elevation_m: f64,
        door: Option<DoorUid>,
        time_s: f64,
        mesh: HazardMesh,
    ) -> HazardKey {
        let key = self.key(quantity, elevation_m, door, time_s);
        trace!("Storing hazard mesh for {}", key);
        self.meshes.insert(key, mesh);
        key
    }

    /// Read a mesh from a CSV file and store it.
    pub fn load_csv<P: AsRef<Path>>(
        &mut self,
        path: P,
        quantity: HazardQuantity,
        elevation_m: f64,
        door: Option<DoorUid>,
        time_s: f64,
    ) -> Result<HazardKey, HazardError> {
        let mesh = HazardMesh::from_csv_reader(File::open(path.as_ref())?)?;
        debug!(
            "Loaded {} mesh from {}",
            quantity,
            path.as_ref().display()
        );
        Ok(self.insert(quantity, elevation_m, door, time_s, mesh))
    }

    /// The time bucket of a lookup, rounded down to the update interval and clamped to the
    /// final time.
    fn time_bucket(&self, time_s: f64) -> u32 {
        if !(self.params.update_interval_s > 0.0) {
            return 0;
        }

        let t = time_s.min(self.params.final_time_s).max(0.0);
        if t.is_nan() {
            return 0;
        }

        (t / self.params.update_interval_s).floor() as u32
    }

    fn elevation_bucket(&self, elevation_m: f64) -> i32 {
        if !(self.params.elevation_bucket_m > 0.0) || !elevation_m.is_finite() {
            return 0;
        }

        (elevation_m / self.params.elevation_bucket_m).round() as i32
    }

    /// The stored key nearest in elevation to `target` for the quantity, door and time, ties going
    /// to the lower elevation.
    fn nearest_key(
        &self,
        quantity: HazardQuantity,
        door: Option<DoorUid>,
        time_bucket: u32,
        target: i32,
    ) -> Option<HazardKey> {
        self.meshes
            .keys()
            .filter(|k| k.quantity == quantity && k.door == door && k.time_bucket == time_bucket)
            .min_by_key(|k| ((k.elevation_bucket as i64 - target as i64).abs(), k.elevation_bucket))
            .copied()
    }
}

impl HazardField for HazardMeshStorage {
    /// Meshes computed for the query's door are preferred at any elevation, the shared ones are
    /// only read when the door has none at this time.
    fn lookup(&self, query: &HazardQuery) -> Result<f64, HazardError> {
        let time_bucket = self.time_bucket(query.time_s);
        let target = self.elevation_bucket(query.elevation_m + self.params.eye_height_m);

        let key = query
            .door
            .and_then(|d| self.nearest_key(query.quantity, Some(d), time_bucket, target))
            .or_else(|| self.nearest_key(query.quantity, None, time_bucket, target))
            .ok_or(HazardError::NotFound(HazardKey {
                quantity: query.quantity,
                elevation_bucket: target,
                door: query.door,
                time_bucket,
            }))?;

        let mesh = self.meshes.get(&key).ok_or(HazardError::NotFound(key))?;

        Ok(sanitize(mesh.value_at(&query.position)))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
