use ndarray::{s, Array3, Zip};

use crate::data::model::{Cube, Wavelengths};
use crate::error::{CubeError, Result};

// ---------------------------------------------------------------------------
// Spatial binning
// ---------------------------------------------------------------------------

/// Sum non-overlapping `bin_size x bin_size` pixel blocks, band by band.
///
/// Rows and columns beyond the last full block are dropped.
pub fn bin_spatial(cube: &Cube, bin_size: usize) -> Result<Cube> {
    let (rows, cols, bands) = cube.dim();
    check_bin_size(bin_size, rows)?;
    check_bin_size(bin_size, cols)?;

    if bin_size == 1 {
        return Ok(cube.clone());
    }

    let source = cube.data();
    let mut binned = Array3::<f64>::zeros((rows / bin_size, cols / bin_size, bands));
    Zip::indexed(&mut binned).par_for_each(|(r, c, b), cell| {
        let (r0, c0) = (r * bin_size, c * bin_size);
        *cell = source
            .slice(s![r0..r0 + bin_size, c0..c0 + bin_size, b])
            .sum();
    });

    Cube::new(binned)
}

// ---------------------------------------------------------------------------
// Spectral binning
// ---------------------------------------------------------------------------

/// Sum groups of `bin_size` adjacent bands and average their wavelengths.
///
/// Bands beyond the last full group are dropped, along with their wavelengths.
pub fn bin_spectral(
    cube: &Cube,
    bin_size: usize,
    wavelengths: &[f64],
) -> Result<(Cube, Wavelengths)> {
    cube.check_wavelengths(wavelengths)?;
    let (rows, cols, bands) = cube.dim();
    check_bin_size(bin_size, bands)?;

    if bin_size == 1 {
        return Ok((cube.clone(), wavelengths.to_vec()));
    }

    let source = cube.data();
    let mut binned = Array3::<f64>::zeros((rows, cols, bands / bin_size));
    Zip::indexed(&mut binned).par_for_each(|(r, c, k), cell| {
        let b0 = k * bin_size;
        *cell = source.slice(s![r, c, b0..b0 + bin_size]).sum();
    });

    let centres = wavelengths
        .chunks_exact(bin_size)
        .map(|group| group.iter().sum::<f64>() / bin_size as f64)
        .collect();

    Ok((Cube::new(binned)?, centres))
}

fn check_bin_size(size: usize, len: usize) -> Result<()> {
    if size == 0 || size > len {
        return Err(CubeError::InvalidBinSize { size, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn ramp(rows: usize, cols: usize, bands: usize) -> Cube {
        let data = Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| {
            (r * cols * bands + c * bands + b) as f64
        });
        Cube::new(data).unwrap()
    }

    #[test]
    fn test_spatial_identity() {
        let cube = ramp(3, 5, 4);
        assert_eq!(bin_spatial(&cube, 1).unwrap(), cube);
    }

    #[test]
    fn test_spatial_block_sums() {
        let cube = ramp(4, 4, 1);
        let binned = bin_spatial(&cube, 2).unwrap();

        let expected = array![[10.0, 18.0], [42.0, 50.0]];
        assert_eq!(binned.dim(), (2, 2, 1));
        assert_eq!(binned.data().slice(s![.., .., 0]), expected);
    }

    #[test]
    fn test_spatial_drops_remainder() {
        let cube = Cube::new(Array3::from_elem((5, 7, 3), 1.0)).unwrap();
        let binned = bin_spatial(&cube, 2).unwrap();

        assert_eq!(binned.dim(), (2, 3, 3));
        assert!(binned.data().iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_spatial_bin_size_bounds() {
        let cube = ramp(3, 8, 2);
        assert_eq!(
            bin_spatial(&cube, 4).unwrap_err(),
            CubeError::InvalidBinSize { size: 4, len: 3 }
        );
        assert!(bin_spatial(&cube, 0).is_err());
        assert_eq!(bin_spatial(&cube, 3).unwrap().dim(), (1, 2, 2));
    }

    #[test]
    fn test_spectral_identity() {
        let cube = ramp(2, 2, 5);
        let wl = vec![400.0, 410.0, 420.0, 430.0, 440.0];
        let (binned, centres) = bin_spectral(&cube, 1, &wl).unwrap();
        assert_eq!(binned, cube);
        assert_eq!(centres, wl);
    }

    #[test]
    fn test_spectral_sums_and_centres() {
        let cube = ramp(1, 2, 5);
        let wl = vec![400.0, 410.0, 420.0, 430.0, 440.0];
        let (binned, centres) = bin_spectral(&cube, 2, &wl).unwrap();

        assert_eq!(binned.dim(), (1, 2, 2));
        // pixel (0, 1) holds bands 5..10
        assert_eq!(binned.pixel(0, 1).to_vec(), vec![11.0, 15.0]);
        assert_eq!(binned.pixel(0, 0).to_vec(), vec![1.0, 5.0]);
        assert_eq!(centres, vec![405.0, 425.0]);
    }

    #[test]
    fn test_spectral_wavelength_mismatch() {
        let cube = ramp(1, 1, 4);
        let err = bin_spectral(&cube, 2, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, CubeError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_spectral_bin_larger_than_bands() {
        let cube = ramp(1, 1, 3);
        let err = bin_spectral(&cube, 4, &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, CubeError::InvalidBinSize { size: 4, len: 3 });
    }
}
