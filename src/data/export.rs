use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::Array3;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use crate::color::composite_to_rgb8;
use crate::processing::spectrum::SpectrumSet;

/// One exported row: a wavelength and every transform at that band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumRow {
    pub wavelength: f64,
    pub mean: f64,
    pub standardized: f64,
    pub first_derivative: f64,
    pub second_derivative: f64,
}

pub fn spectrum_rows(wavelengths: &[f64], spectra: &SpectrumSet) -> Vec<SpectrumRow> {
    wavelengths
        .iter()
        .enumerate()
        .map(|(i, &wavelength)| SpectrumRow {
            wavelength,
            mean: spectra.mean[i],
            standardized: spectra.standardized[i],
            first_derivative: spectra.first_derivative[i],
            second_derivative: spectra.second_derivative[i],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write the spectra of a selection to a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one row per band
/// * `.json`    – `[{ "wavelength": ..., "mean": ..., ... }, ...]`
/// * `.parquet` – one Float64 column per field
pub fn export_spectra(path: &Path, wavelengths: &[f64], spectra: &SpectrumSet) -> Result<()> {
    if spectra.mean.len() != wavelengths.len() {
        bail!(
            "{} wavelengths for a spectrum of {} bands",
            wavelengths.len(),
            spectra.mean.len()
        );
    }
    let rows = spectrum_rows(wavelengths, spectra);

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => write_csv(path, &rows),
        "json" => write_json(path, &rows),
        "parquet" | "pq" => write_parquet(path, &rows),
        other => bail!("Unsupported export extension: .{other}"),
    }
}

fn write_csv(path: &Path, rows: &[SpectrumRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_json(path: &Path, rows: &[SpectrumRow]) -> Result<()> {
    let text = serde_json::to_string_pretty(rows).context("serializing JSON")?;
    std::fs::write(path, text).context("writing JSON file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[SpectrumRow]) -> Result<()> {
    let column = |f: fn(&SpectrumRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let names = [
        "wavelength",
        "mean",
        "standardized",
        "first_derivative",
        "second_derivative",
    ];
    let schema = Arc::new(Schema::new(
        names
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            column(|r| r.wavelength),
            column(|r| r.mean),
            column(|r| r.standardized),
            column(|r| r.first_derivative),
            column(|r| r.second_derivative),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Composite image
// ---------------------------------------------------------------------------

/// Save a `[0, 1]` (rows, cols, 3) composite as an 8-bit PNG.
pub fn export_composite(path: &Path, composite: &Array3<f64>) -> Result<()> {
    let (rows, cols, _) = composite.dim();
    let image = image::RgbImage::from_raw(cols as u32, rows as u32, composite_to_rgb8(composite))
        .context("composite buffer does not match its dimensions")?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn sample_set() -> (Vec<f64>, SpectrumSet) {
        let wl = vec![1000.0, 1010.0, 1020.0];
        let set = SpectrumSet {
            mean: vec![0.1, 0.2, 0.4],
            standardized: vec![-1.0, -0.2, 1.2],
            first_derivative: vec![0.01, 0.015, 0.02],
            second_derivative: vec![0.0005, 0.0005, 0.0005],
        };
        (wl, set)
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum.csv");
        let (wl, set) = sample_set();
        export_spectra(&path, &wl, &set).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec!["wavelength", "mean", "standardized", "first_derivative", "second_derivative"]
        );
        assert_eq!(reader.records().count(), 3);
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum.json");
        let (wl, set) = sample_set();
        export_spectra(&path, &wl, &set).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["mean"], 0.4);
        assert_eq!(records[0]["wavelength"], 1000.0);
    }

    #[test]
    fn test_parquet_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum.parquet");
        let (wl, set) = sample_set();
        export_spectra(&path, &wl, &set).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
        assert_eq!(batches[0].num_columns(), 5);
    }

    #[test]
    fn test_composite_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composite.png");
        let mut composite = Array3::<f64>::zeros((3, 5, 3));
        composite[[2, 4, 1]] = 1.0;
        export_composite(&path, &composite).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (5, 3));
        assert_eq!(loaded.get_pixel(4, 2).0, [0, 255, 0]);
    }

    #[test]
    fn test_rejects_unknown_extension_and_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (wl, set) = sample_set();
        assert!(export_spectra(&dir.path().join("s.xlsx"), &wl, &set).is_err());
        assert!(export_spectra(&dir.path().join("s.csv"), &wl[..2], &set).is_err());
    }
}
