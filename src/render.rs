use crate::types::{MapDescription, Marker, Zoom};
use std::f64::consts::PI;
use std::fmt::Write;
use tracing::warn;

// Constants for Web Mercator
const TILE_SIZE: f64 = 256.0;

/// Renders a map view as a standalone, non-interactive HTML document.
pub fn render_document(map: &MapDescription) -> String {
    let mut html = String::new();
    let title = escape(&map.title);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\nbody {{ font-family: Arial, sans-serif; margin: 0 auto; max-width: {w}px; }}\n\
         h1 {{ text-align: center; font-size: 1.4em; }}\n\
         svg {{ background: #f2efe9; border: 1px solid #ccc; }}\n\
         table {{ border-collapse: collapse; margin-top: 20px; font-size: 12px; width: 100%; }}\n\
         th, td {{ border: 1px solid #ddd; padding: 4px; text-align: left; }}\n</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n",
        w = map.style.width,
    );

    html.push_str(&render_svg(map));
    html.push_str(&render_table(map));
    html.push_str("</body>\n</html>\n");
    html
}

fn render_svg(map: &MapDescription) -> String {
    let (w, h) = (map.style.width as f64, map.style.height as f64);
    let (cx, cy) = lat_lon_to_world_pixel(map.center[0], map.center[1], map.zoom);
    let radius = map.style.marker_size as f64 / 2.0;
    let color = escape(&map.style.marker_color);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" \
         data-basemap=\"{}\" data-zoom=\"{}\">",
        escape(&map.style.basemap),
        map.zoom,
    );

    for marker in &map.markers {
        let (px, py) = lat_lon_to_world_pixel(marker.latitude, marker.longitude, map.zoom);
        let x = px - cx + w / 2.0;
        let y = py - cy + h / 2.0;
        // Latitudes beyond the poles have no Mercator position; the table still lists them.
        if !x.is_finite() || !y.is_finite() {
            warn!("Not drawing {:?}: no map position for ({}, {})", marker.label, marker.latitude, marker.longitude);
            continue;
        }
        let _ = writeln!(
            svg,
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"{radius}\" fill=\"{color}\" fill-opacity=\"0.8\">\
             <title>{}</title></circle>",
            hover_text(marker),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn render_table(map: &MapDescription) -> String {
    let mut table = String::from("<table>\n<thead><tr><th>Nome da Escola</th>");
    if let Some(first) = map.markers.first() {
        for field in &first.fields {
            let _ = write!(table, "<th>{}</th>", escape(field.label));
        }
    }
    table.push_str("</tr></thead>\n<tbody>\n");

    for marker in &map.markers {
        let _ = write!(table, "<tr><td>{}</td>", escape(&marker.label));
        for field in &marker.fields {
            let _ = write!(table, "<td>{}</td>", escape(&field.value));
        }
        table.push_str("</tr>\n");
    }

    table.push_str("</tbody>\n</table>\n");
    table
}

fn hover_text(marker: &Marker) -> String {
    let mut text = escape(&marker.label);
    for field in &marker.fields {
        let _ = write!(text, "\n{}: {}", escape(field.label), escape(&field.value));
    }
    text
}

// Coordinate conversions
fn lat_lon_to_world_pixel(lat: f64, lon: f64, zoom: Zoom) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom.level() as i32) * TILE_SIZE;
    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;
    (x, y)
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
