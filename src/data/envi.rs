use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::Array3;

use super::model::{Cube, Header, HeaderValue, Wavelengths};

/// Extensions tried, in order, when locating the data file next to a header.
const DATA_EXTENSIONS: [&str; 4] = ["img", "dat", "raw", "bin"];

/// Extension used for data files written by [`save`].
pub const DATA_EXTENSION: &str = "img";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load an ENVI cube from its `.hdr` file.
///
/// Returns the cube as (row, column, band), its wavelengths and the parsed
/// header. When the header carries no `wavelength` list, band indices are used.
pub fn load(path: &Path) -> Result<(Cube, Wavelengths, Header)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading ENVI header {}", path.display()))?;
    let header = parse_header(&text)
        .with_context(|| format!("parsing ENVI header {}", path.display()))?;
    let layout = Layout::from_header(&header)?;

    let data_path = find_data_file(path)?;
    log::debug!("Reading {} ({layout:?})", data_path.display());
    let bytes = std::fs::read(&data_path)
        .with_context(|| format!("reading data file {}", data_path.display()))?;
    let data = decode(&bytes, &layout)
        .with_context(|| format!("decoding data file {}", data_path.display()))?;
    let cube = Cube::new(data)?;

    let wavelengths = match header.wavelengths() {
        Some(wl) => wl,
        None => {
            log::warn!("{} has no wavelength list, using band indices", path.display());
            (0..layout.bands).map(|b| b as f64).collect()
        }
    };
    cube.check_wavelengths(&wavelengths)
        .with_context(|| format!("wavelength list of {}", path.display()))?;

    Ok((cube, wavelengths, header))
}

/// Write `cube` as a little-endian `f64` BSQ file pair `<stem>.hdr` + `<stem>.img`.
///
/// The geometry, sample type and wavelength entries of `header` are replaced
/// to describe what is written; every other entry is kept.
pub fn save(path: &Path, header: &Header, cube: &Cube, wavelengths: &[f64]) -> Result<()> {
    cube.check_wavelengths(wavelengths)?;
    let (rows, cols, bands) = cube.dim();

    let mut header = header.clone();
    header.set_scalar("samples", cols);
    header.set_scalar("lines", rows);
    header.set_scalar("bands", bands);
    header.set_scalar("header offset", 0);
    header.set_scalar("file type", "ENVI Standard");
    header.set_scalar("data type", DataType::F64.code());
    header.set_scalar("interleave", "bsq");
    header.set_scalar("byte order", 0);
    header.set(
        "wavelength",
        HeaderValue::List(wavelengths.iter().map(|w| w.to_string()).collect()),
    );
    // Stale per-band metadata no longer lines up after binning.
    header.remove("fwhm");
    header.remove("band names");

    let hdr_path = path.with_extension("hdr");
    let data_path = path.with_extension(DATA_EXTENSION);

    std::fs::write(&hdr_path, render_header(&header))
        .with_context(|| format!("writing ENVI header {}", hdr_path.display()))?;

    let mut bytes = Vec::with_capacity(rows * cols * bands * 8);
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..cols {
                bytes.extend_from_slice(&cube.data()[[r, c, b]].to_le_bytes());
            }
        }
    }
    std::fs::write(&data_path, bytes)
        .with_context(|| format!("writing data file {}", data_path.display()))?;

    log::debug!("Wrote {} ({cube})", hdr_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Header text
// ---------------------------------------------------------------------------

/// Parse ENVI header text. The first line must be `ENVI`; values in braces may
/// span several lines.
pub fn parse_header(text: &str) -> Result<Header> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim() == "ENVI" => {}
        _ => bail!("missing 'ENVI' signature on the first line"),
    }

    let mut header = Header::default();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Skipping malformed header line: {line}");
            continue;
        };

        let mut value = value.trim().to_string();
        if value.starts_with('{') {
            while !value.contains('}') {
                let Some(next) = lines.next() else {
                    bail!("unterminated '{{' in header entry '{}'", key.trim());
                };
                value.push(' ');
                value.push_str(next.trim());
            }
            let inner = value.trim_start_matches('{');
            let inner = inner.split('}').next().unwrap_or("");
            let items = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            header.set(key.trim(), HeaderValue::List(items));
        } else {
            header.set(key.trim(), HeaderValue::Scalar(value));
        }
    }
    Ok(header)
}

pub fn render_header(header: &Header) -> String {
    let mut out = String::from("ENVI\n");
    for (key, value) in header.iter() {
        out.push_str(&format!("{key} = {value}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Raw sample layout
// ---------------------------------------------------------------------------

/// ENVI `data type` codes this reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl DataType {
    pub fn from_code(code: usize) -> Option<Self> {
        Some(match code {
            1 => DataType::U8,
            2 => DataType::I16,
            3 => DataType::I32,
            4 => DataType::F32,
            5 => DataType::F64,
            12 => DataType::U16,
            13 => DataType::U32,
            14 => DataType::I64,
            15 => DataType::U64,
            _ => return None,
        })
    }

    pub fn code(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 => 2,
            DataType::I32 => 3,
            DataType::F32 => 4,
            DataType::F64 => 5,
            DataType::U16 => 12,
            DataType::U32 => 13,
            DataType::I64 => 14,
            DataType::U64 => 15,
        }
    }

    pub fn size(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
        }
    }

    fn read(self, bytes: &[u8], big_endian: bool) -> f64 {
        macro_rules! num {
            ($t:ty, $n:literal) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                if big_endian {
                    <$t>::from_be_bytes(buf) as f64
                } else {
                    <$t>::from_le_bytes(buf) as f64
                }
            }};
        }
        match self {
            DataType::U8 => bytes[0] as f64,
            DataType::I16 => num!(i16, 2),
            DataType::U16 => num!(u16, 2),
            DataType::I32 => num!(i32, 4),
            DataType::U32 => num!(u32, 4),
            DataType::F32 => num!(f32, 4),
            DataType::F64 => num!(f64, 8),
            DataType::I64 => num!(i64, 8),
            DataType::U64 => num!(u64, 8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    Bsq,
    Bil,
    Bip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    rows: usize,
    cols: usize,
    bands: usize,
    data_type: DataType,
    interleave: Interleave,
    big_endian: bool,
    offset: usize,
}

impl Layout {
    fn from_header(header: &Header) -> Result<Self> {
        let field = |key: &str| {
            header
                .usize_field(key)
                .with_context(|| format!("header missing or invalid '{key}'"))
        };
        let code = field("data type")?;
        let data_type = DataType::from_code(code)
            .with_context(|| format!("unsupported data type {code}"))?;
        let interleave = header
            .get("interleave")
            .map(|v| v.to_string().to_ascii_lowercase());
        let interleave = match interleave {
            None => Interleave::Bsq,
            Some(s) => match s.trim() {
                "bsq" => Interleave::Bsq,
                "bil" => Interleave::Bil,
                "bip" => Interleave::Bip,
                other => bail!("unsupported interleave '{other}'"),
            },
        };
        Ok(Layout {
            rows: field("lines")?,
            cols: field("samples")?,
            bands: field("bands")?,
            data_type,
            interleave,
            big_endian: header.usize_field("byte order").unwrap_or(0) == 1,
            offset: header.usize_field("header offset").unwrap_or(0),
        })
    }
}

fn decode(bytes: &[u8], layout: &Layout) -> Result<Array3<f64>> {
    let Layout { rows, cols, bands, .. } = *layout;
    let size = layout.data_type.size();
    let Some(needed) = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(bands))
        .and_then(|n| n.checked_mul(size))
        .and_then(|n| n.checked_add(layout.offset))
    else {
        bail!("header geometry overflows: {rows} lines x {cols} samples x {bands} bands");
    };
    if bytes.len() < needed {
        bail!("expected at least {needed} bytes, found {}", bytes.len());
    }

    let values: Vec<f64> = bytes[layout.offset..needed]
        .chunks_exact(size)
        .map(|chunk| layout.data_type.read(chunk, layout.big_endian))
        .collect();

    // Build in file order, then permute to (row, col, band).
    let cube = match layout.interleave {
        Interleave::Bsq => Array3::from_shape_vec((bands, rows, cols), values)?
            .permuted_axes([1, 2, 0]),
        Interleave::Bil => Array3::from_shape_vec((rows, bands, cols), values)?
            .permuted_axes([0, 2, 1]),
        Interleave::Bip => Array3::from_shape_vec((rows, cols, bands), values)?,
    };
    Ok(cube.as_standard_layout().into_owned())
}

fn find_data_file(header_path: &Path) -> Result<PathBuf> {
    let bare = header_path.with_extension("");
    if bare.is_file() {
        return Ok(bare);
    }
    DATA_EXTENSIONS
        .iter()
        .map(|ext| header_path.with_extension(ext))
        .find(|p| p.is_file())
        .with_context(|| format!("no data file found next to {}", header_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const HEADER: &str = "ENVI\n\
description = {\n  test cube, two lines}\n\
samples = 3\n\
lines = 2\n\
bands = 2\n\
header offset = 4\n\
data type = 12\n\
interleave = bil\n\
byte order = 1\n\
wavelength = { 1000.0, 1005.5 }\n";

    #[test]
    fn test_parse_header_multiline_lists() {
        let header = parse_header(HEADER).unwrap();
        assert_eq!(header.usize_field("samples"), Some(3));
        assert_eq!(header.wavelengths(), Some(vec![1000.0, 1005.5]));
        assert_eq!(
            header.get("description"),
            Some(&HeaderValue::List(vec!["test cube".into(), "two lines".into()]))
        );
    }

    #[test]
    fn test_parse_header_requires_signature() {
        assert!(parse_header("samples = 3\n").is_err());
        assert!(parse_header("ENVI\nwavelength = { 1, 2\n").is_err());
    }

    #[test]
    fn test_load_big_endian_bil() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("cube.hdr");
        std::fs::write(&hdr, HEADER).unwrap();

        // BIL: for each line, band 0 samples then band 1 samples.
        let values: [u16; 12] = [1, 2, 3, 10, 20, 30, 4, 5, 6, 40, 50, 60];
        let mut bytes = vec![0xAA; 4];
        for v in values {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        std::fs::write(dir.path().join("cube.raw"), bytes).unwrap();

        let (cube, wl, _) = load(&hdr).unwrap();
        assert_eq!(cube.dim(), (2, 3, 2));
        assert_eq!(cube.pixel(0, 1).to_vec(), vec![2.0, 20.0]);
        assert_eq!(cube.pixel(1, 2).to_vec(), vec![6.0, 60.0]);
        assert_eq!(wl, vec![1000.0, 1005.5]);
    }

    #[test]
    fn test_save_then_load_preserves_cube() {
        let dir = tempfile::tempdir().unwrap();
        let data = Array3::from_shape_fn((3, 4, 5), |(r, c, b)| r as f64 * 0.5 - c as f64 + b as f64 * 1e-3);
        let cube = Cube::new(data).unwrap();
        let wl: Vec<f64> = (0..5).map(|b| 900.0 + 3.25 * b as f64).collect();

        let mut header = parse_header(HEADER).unwrap();
        header.set_scalar("sensor type", "swir");
        let path = dir.path().join("out.hdr");
        save(&path, &header, &cube, &wl).unwrap();
        assert!(dir.path().join("out.img").is_file());

        let (loaded, loaded_wl, loaded_header) = load(&path).unwrap();
        assert_eq!(loaded, cube);
        assert_eq!(loaded_wl, wl);
        assert_eq!(loaded_header.usize_field("bands"), Some(5));
        assert_eq!(loaded_header.usize_field("header offset"), Some(0));
        assert_eq!(
            loaded_header.get("sensor type"),
            Some(&HeaderValue::Scalar("swir".into()))
        );
    }

    #[test]
    fn test_load_reports_short_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("short.hdr");
        std::fs::write(&hdr, HEADER).unwrap();
        std::fs::write(dir.path().join("short.img"), [0u8; 6]).unwrap();

        let err = load(&hdr).unwrap_err();
        assert!(format!("{err:#}").contains("expected at least"));
    }

    #[test]
    fn test_oversized_geometry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("huge.hdr");
        std::fs::write(
            &hdr,
            "ENVI\nsamples = 4294967296\nlines = 4294967296\nbands = 2\ndata type = 4\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("huge.img"), [0u8; 16]).unwrap();

        let err = load(&hdr).unwrap_err();
        assert!(format!("{err:#}").contains("header geometry overflows"));
    }

    #[test]
    fn test_every_interleave_loads_the_same_cube() {
        let dir = tempfile::tempdir().unwrap();
        let (rows, cols, bands) = (2, 3, 4);
        let data = Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| {
            (r * 100 + c * 10 + b) as f32
        });

        for (name, order) in [("bsq", [2, 0, 1]), ("bil", [0, 2, 1]), ("bip", [0, 1, 2])] {
            let mut bytes = Vec::new();
            for v in data.view().permuted_axes(order).iter() {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            let hdr = dir.path().join(format!("{name}.hdr"));
            std::fs::write(
                &hdr,
                format!(
                    "ENVI\nsamples = {cols}\nlines = {rows}\nbands = {bands}\n\
                     data type = 4\ninterleave = {name}\nwavelength = {{1, 2, 3, 4}}\n"
                ),
            )
            .unwrap();
            std::fs::write(dir.path().join(format!("{name}.dat")), bytes).unwrap();

            let (cube, wl, _) = load(&hdr).unwrap();
            assert_eq!(cube.data(), &data.mapv(f64::from), "{name}");
            assert_eq!(wl, vec![1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn test_bip_layout() {
        let layout = Layout {
            rows: 1,
            cols: 2,
            bands: 3,
            data_type: DataType::U8,
            interleave: Interleave::Bip,
            big_endian: false,
            offset: 0,
        };
        let cube = decode(&[1, 2, 3, 4, 5, 6], &layout).unwrap();
        assert_eq!(cube[[0, 1, 0]], 4.0);
        assert_eq!(cube[[0, 0, 2]], 3.0);
    }
}
