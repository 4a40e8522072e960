use crate::config::{AppConfig, InputConfig};
use crate::types::{Dataset, School};
use anyhow::{Context, Result, anyhow};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// Fixed positional layout of the source sheet.
pub const COL_LOT: usize = 0;
pub const COL_REGION: usize = 1;
pub const COL_MUNICIPALITY: usize = 2;
pub const COL_INEP: usize = 3;
pub const COL_NAME: usize = 4;
pub const COL_ADDRESS: usize = 5;
pub const COL_LATITUDE: usize = 6;
pub const COL_LONGITUDE: usize = 7;
pub const COL_WIFI_KITS: usize = 8;
pub const COL_ADDITIONAL_APS: usize = 9;
pub const COL_BACKUP_POWER: usize = 10;

pub const LABEL_INEP: &str = "Código INEP";
pub const LABEL_ADDRESS: &str = "Endereço";
pub const LABEL_WIFI_KITS: &str = "Kit Wi-Fi (estimado)";
pub const LABEL_ADDITIONAL_APS: &str = "AP adicional (estimado)";
pub const LABEL_BACKUP_POWER: &str = "Nobreak";

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    let path = &config.input.spreadsheet;
    info!("Loading schools from {:?}...", path);

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Spreadsheet has no extension: {:?}", path))?;

    let dataset = match extension.as_str() {
        "csv" | "txt" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open spreadsheet: {:?}", path))?;
            load_from_reader(file, &config.input)
                .with_context(|| format!("Failed to read spreadsheet: {:?}", path))?
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path, &config.input)?,
        _ => return Err(anyhow!("Unsupported spreadsheet format: {}", extension)),
    };

    info!("Loaded {} schools", dataset.len());
    if dataset.is_empty() {
        warn!("No rows with usable coordinates in {:?}", path);
    }
    if dataset.skipped_rows() > 0 {
        warn!("Skipped {} rows without usable coordinates", dataset.skipped_rows());
    }

    Ok(dataset)
}

/// Reads delimited text. Cells that are not valid UTF-8 are decoded lossily.
pub fn load_from_reader<R: Read>(reader: R, input: &InputConfig) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(input.delimiter as u8)
        .from_reader(reader);

    if rdr.byte_headers()?.is_empty() {
        return Err(anyhow!("Spreadsheet has no header row"));
    }

    let mut rows = Vec::new();
    for (i, result) in rdr.byte_records().enumerate() {
        // Line 1 is the header.
        let record = result.with_context(|| format!("Malformed row at line {}", i + 2))?;
        let cells: Vec<String> = record.iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        rows.push((i + 2, cells));
    }

    Ok(collect_schools(rows, &input.missing_cell))
}

/// Reads the computed values of the first worksheet. Row 1 of the sheet is the header.
pub fn load_workbook(path: &Path, input: &InputConfig) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open spreadsheet: {:?}", path))?;
    let range = workbook.worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Spreadsheet has no worksheets: {:?}", path))?
        .with_context(|| format!("Failed to read first worksheet: {:?}", path))?;

    // The range starts at the first used cell, not at A1.
    let (start_row, start_col) = range.start()
        .ok_or_else(|| anyhow!("Spreadsheet has no header row"))?;

    let mut rows = Vec::new();
    for (i, row) in range.rows().enumerate() {
        let sheet_row = start_row as usize + i;
        if sheet_row == 0 {
            continue;
        }
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_text));
        rows.push((sheet_row + 1, cells));
    }

    Ok(collect_schools(rows, &input.missing_cell))
}

fn collect_schools(rows: Vec<(usize, Vec<String>)>, missing: &str) -> Dataset {
    let mut schools = Vec::new();
    let mut skipped = 0;

    for (line, cells) in rows {
        match parse_school(&cells, missing) {
            Some(school) => schools.push(school),
            None => {
                debug!("Skipping line {}: unusable coordinates", line);
                skipped += 1;
            }
        }
    }

    Dataset::new(schools, skipped)
}

/// Integral numbers print without a fractional part, so `35000001.0` reads as `35000001`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Returns `None` when either coordinate is missing, non-numeric or not finite.
fn parse_school(cells: &[String], missing: &str) -> Option<School> {
    let latitude = parse_coordinate(cells.get(COL_LATITUDE))?;
    let longitude = parse_coordinate(cells.get(COL_LONGITUDE))?;

    let cell = |idx: usize| match cells.get(idx) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => missing.to_string(),
    };

    Some(School {
        lot: cell(COL_LOT),
        region_code: cell(COL_REGION),
        municipality: cell(COL_MUNICIPALITY),
        inep_code: cell(COL_INEP),
        name: cell(COL_NAME),
        address: cell(COL_ADDRESS),
        latitude,
        longitude,
        estimated_wifi_kits: cell(COL_WIFI_KITS),
        estimated_additional_aps: cell(COL_ADDITIONAL_APS),
        has_backup_power: cell(COL_BACKUP_POWER),
    })
}

fn parse_coordinate(cell: Option<&String>) -> Option<f64> {
    cell?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
