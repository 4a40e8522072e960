use crate::config::MapConfig;
use crate::data::{
    LABEL_ADDITIONAL_APS, LABEL_ADDRESS, LABEL_BACKUP_POWER, LABEL_INEP, LABEL_WIFI_KITS,
};
use crate::types::{HoverField, MapDescription, MapStyle, Marker, School, Zoom};
use geo::{Centroid, MultiPoint, Point};

pub fn map_title(region: &str) -> String {
    format!("Escolas no Estado {}", region)
}

/// Builds the map view for `schools`, one marker per school, centred on their mean position.
pub fn project(schools: &[&School], zoom: Zoom, region: &str, config: &MapConfig) -> MapDescription {
    let markers: Vec<Marker> = schools.iter().map(|s| marker_for(s)).collect();

    let points: MultiPoint<f64> = markers.iter()
        .map(|m| Point::new(m.longitude, m.latitude))
        .collect::<Vec<_>>()
        .into();
    let center = points.centroid()
        .map(|c| [c.y(), c.x()])
        .unwrap_or(config.default_center);

    MapDescription {
        title: map_title(region),
        region: region.to_string(),
        zoom,
        center,
        style: MapStyle {
            basemap: config.basemap.clone(),
            marker_color: config.marker_color.clone(),
            marker_size: config.marker_size,
            width: config.width,
            height: config.height,
        },
        markers,
    }
}

fn marker_for(school: &School) -> Marker {
    let field = |label, value: &String| HoverField { label, value: value.clone() };

    Marker {
        latitude: school.latitude,
        longitude: school.longitude,
        label: school.name.clone(),
        fields: vec![
            field(LABEL_INEP, &school.inep_code),
            field(LABEL_ADDRESS, &school.address),
            field(LABEL_WIFI_KITS, &school.estimated_wifi_kits),
            field(LABEL_ADDITIONAL_APS, &school.estimated_additional_aps),
            field(LABEL_BACKUP_POWER, &school.has_backup_power),
        ],
    }
}
