//! Dataset input and result export.

use crate::report::SimulationResult;
use anyhow::{Context, Result, bail};
use csv::{Reader, Writer};
use std::path::Path;

/// Read the numeric values of `column` from a CSV file with a header row.
///
/// Blank and non-numeric cells are skipped.
pub fn load_column<P: AsRef<Path>>(file: P, column: &str) -> Result<Vec<f64>> {
    let file = file.as_ref();
    let mut reader = Reader::from_path(file).with_context(|| format!("failed to open {file:?}"))?;

    let headers = reader.headers().context("failed to read header row")?.clone();
    let i_col = headers
        .iter()
        .position(|header| header.trim() == column)
        .with_context(|| format!("column {column:?} not found in {file:?}"))?;

    let mut values = Vec::new();
    let mut n_skipped = 0;
    for (i_row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read row {i_row}"))?;
        let value = record
            .get(i_col)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite());
        match value {
            Some(value) => values.push(value),
            None => n_skipped += 1,
        }
    }

    if n_skipped > 0 {
        log::warn!("skipped {n_skipped} non-numeric cells of column {column:?}");
    }
    if values.is_empty() {
        bail!("column {column:?} has no numeric values");
    }
    log::info!("loaded {} values from {file:?}", values.len());

    Ok(values)
}

/// Write one row per grid point, with one column per metric and decision limit.
pub fn write_points_csv<P: AsRef<Path>>(file: P, result: &SimulationResult) -> Result<()> {
    let file = file.as_ref();
    let mut writer =
        Writer::from_path(file).with_context(|| format!("failed to create {file:?}"))?;

    let mut header: Vec<String> = [
        "mu",
        "bias",
        "agreement",
        "sensitivity",
        "specificity",
        "agreement_cat",
        "sensitivity_cat",
        "specificity_cat",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect();
    for metric in ["agreement", "sensitivity", "specificity"] {
        header.extend(result.names.iter().map(|name| format!("{metric}_{name}")));
    }
    writer.write_record(&header).context("failed to write header")?;

    for point in &result.points {
        let mut record = vec![
            point.mu.to_string(),
            point.bias.to_string(),
            point.agreement.to_string(),
            point.sensitivity.to_string(),
            point.specificity.to_string(),
            point.agreement_cat.to_string(),
            point.sensitivity_cat.to_string(),
            point.specificity_cat.to_string(),
        ];
        for sublevel in [
            &point.sublevel_agreement,
            &point.sublevel_sensitivity,
            &point.sublevel_specificity,
        ] {
            record.extend(sublevel.iter().map(f64::to_string));
        }
        writer.write_record(&record).context("failed to write record")?;
    }

    writer.flush().context("failed to flush writer stream")?;

    Ok(())
}
