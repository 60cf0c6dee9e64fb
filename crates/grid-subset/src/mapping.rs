//! Canonical role to dataset variable name mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Vertical coordinate names that ROMS output always uses.
pub const ROMS_VERTICAL_COORDINATES: &[&str] = &["s_rho", "s_w"];

/// Maps canonical roles to the variable names a specific dataset uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMapping {
    pub time: String,
    pub lon: String,
    pub lat: String,
    #[serde(default)]
    pub depth: Option<String>,
    /// Data variables keyed by role, e.g. `eastward_velocity: u`.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl VariableMapping {
    /// Mapping for ROMS output (TBOFS, CBOFS and friends).
    pub fn roms() -> Self {
        Self {
            time: "ocean_time".to_string(),
            lon: "lon_rho".to_string(),
            lat: "lat_rho".to_string(),
            depth: Some("s_rho".to_string()),
            data: BTreeMap::from([
                ("eastward_velocity".to_string(), "u".to_string()),
                ("northward_velocity".to_string(), "v".to_string()),
            ]),
        }
    }

    /// Mapping for HYCOM-style rectilinear output.
    pub fn hycom() -> Self {
        Self {
            time: "time".to_string(),
            lon: "lon".to_string(),
            lat: "lat".to_string(),
            depth: Some("depth".to_string()),
            data: BTreeMap::from([
                ("eastward_velocity".to_string(), "water_u".to_string()),
                ("northward_velocity".to_string(), "water_v".to_string()),
            ]),
        }
    }

    /// Look up any role, including the coordinate roles.
    pub fn role(&self, role: &str) -> Option<&str> {
        match role {
            "time" => Some(&self.time),
            "lon" => Some(&self.lon),
            "lat" => Some(&self.lat),
            "depth" => self.depth.as_deref(),
            other => self.data.get(other).map(String::as_str),
        }
    }

    /// Dataset names of every mapped data variable.
    pub fn data_variables(&self) -> impl Iterator<Item = &str> {
        self.data.values().map(String::as_str)
    }

    /// Restrict data variables to the given roles.
    pub fn with_roles(&self, roles: &[String]) -> Self {
        let mut mapping = self.clone();
        mapping.data.retain(|role, _| roles.contains(role));
        mapping
    }

    /// Names that denote vertical coordinates in `coordinates` attributes.
    pub fn vertical_coordinates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = ROMS_VERTICAL_COORDINATES.to_vec();
        if let Some(depth) = self.depth.as_deref() {
            if !names.contains(&depth) {
                names.push(depth);
            }
        }
        names
    }
}
