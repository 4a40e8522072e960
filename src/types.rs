use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One valid spreadsheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    pub lot: String,
    pub region_code: String,
    pub municipality: String,
    pub inep_code: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub estimated_wifi_kits: String,
    pub estimated_additional_aps: String,
    pub has_backup_power: String,
}

/// The schools loaded at startup, in source row order. Never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    schools: Vec<School>,
    skipped_rows: usize,
}

impl Dataset {
    pub fn new(schools: Vec<School>, skipped_rows: usize) -> Self {
        Self { schools, skipped_rows }
    }

    pub fn schools(&self) -> &[School] {
        &self.schools
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }

    /// Rows dropped at load time for unusable coordinates.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("zoom level {0} is outside 1..=20")]
pub struct ZoomError(pub u8);

/// Map zoom level, always within 1..=20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Zoom(u8);

impl Zoom {
    pub fn new(level: u8) -> Result<Self, ZoomError> {
        if (MIN_ZOOM..=MAX_ZOOM).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ZoomError(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(6)
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    // Never includes latitude or longitude.
    pub fields: Vec<HoverField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStyle {
    pub basemap: String,
    pub marker_color: String,
    pub marker_size: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDescription {
    pub title: String,
    pub region: String,
    pub zoom: Zoom,
    pub center: [f64; 2], // [lat, lon]
    pub style: MapStyle,
    pub markers: Vec<Marker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_accepts_inclusive_bounds() {
        assert_eq!(Zoom::new(1).unwrap().level(), 1);
        assert_eq!(Zoom::new(20).unwrap().level(), 20);
        assert_eq!(Zoom::default().level(), 6);
    }

    #[test]
    fn zoom_rejects_outside_bounds() {
        assert_eq!(Zoom::new(0), Err(ZoomError(0)));
        assert_eq!(Zoom::new(21), Err(ZoomError(21)));
        assert_eq!(ZoomError(21).to_string(), "zoom level 21 is outside 1..=20");
    }

    #[test]
    fn zoom_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Zoom::new(10).unwrap()).unwrap(), "10");
    }
}
