use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::CompareError;

/// Marker written where the two images disagree, or where only one of them
/// has pixels at all.
const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Outcome of a pixel scan over two decoded buffers.
pub struct DiffOutcome {
    /// Fraction of differing pixels over the max-dimension grid, in [0, 1].
    pub difference: f64,
    pub diff_pixels: u64,
    pub total_pixels: u64,
    /// maxW x maxH overlay: transparent where equal, opaque red where not.
    pub image: RgbaImage,
}

/// Load a screenshot file into an 8-bit RGBA buffer.
pub fn load_pixels(path: &Path) -> Result<RgbaImage, CompareError> {
    let img = image::open(path).map_err(|source| CompareError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Compare two image files and optionally write the diff overlay as PNG.
///
/// Path-level short-circuits, evaluated before any decoding:
/// - both absent, or the very same path: difference 0, nothing written;
/// - exactly one absent: difference 1, nothing written.
pub fn diff_files(
    left: Option<&Path>,
    right: Option<&Path>,
    artifact: Option<&Path>,
) -> Result<f64, CompareError> {
    let (left, right) = match (left, right) {
        (None, None) => return Ok(0.0),
        (Some(l), Some(r)) if l == r => return Ok(0.0),
        (None, Some(_)) | (Some(_), None) => return Ok(1.0),
        (Some(l), Some(r)) => (l, r),
    };

    let left = load_pixels(left)?;
    let right = load_pixels(right)?;
    let outcome = diff_buffers(&left, &right);

    if let Some(path) = artifact {
        outcome
            .image
            .save(path)
            .map_err(|source| CompareError::ArtifactWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(outcome.difference)
}

/// Per-pixel scan over the maxW x maxH grid, row-major.
///
/// In the overlap region, two pixels are equal when their red, green and blue
/// channels match exactly; alpha is ignored. Outside the overlap (the images
/// differ in size) every pixel counts as different, so a pure size mismatch
/// contributes the non-overlapping area to the ratio.
pub fn diff_buffers(left: &RgbaImage, right: &RgbaImage) -> DiffOutcome {
    let min_w = left.width().min(right.width());
    let min_h = left.height().min(right.height());
    let max_w = left.width().max(right.width());
    let max_h = left.height().max(right.height());

    // The buffer starts fully transparent; only difference markers are written.
    let mut out = RgbaImage::new(max_w, max_h);
    let total_pixels = u64::from(max_w) * u64::from(max_h);
    let mut diff_pixels: u64 = 0;

    for y in 0..max_h {
        for x in 0..max_w {
            let equal = x < min_w && y < min_h && {
                let Rgba([lr, lg, lb, _]) = *left.get_pixel(x, y);
                let Rgba([rr, rg, rb, _]) = *right.get_pixel(x, y);
                lr == rr && lg == rg && lb == rb
            };
            if !equal {
                out.put_pixel(x, y, DIFF_COLOR);
                diff_pixels += 1;
            }
        }
    }

    let difference = if total_pixels == 0 {
        1.0 // degenerate zero-area input
    } else {
        diff_pixels as f64 / total_pixels as f64
    };

    DiffOutcome {
        difference,
        diff_pixels,
        total_pixels,
        image: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, color)
    }

    const GREY: Rgba<u8> = Rgba([200, 200, 200, 255]);

    // -- buffer scan --

    #[test]
    fn identical_buffers_have_zero_difference() {
        let a = solid(10, 10, GREY);
        let r = diff_buffers(&a, &a.clone());
        assert_eq!(r.difference, 0.0);
        assert_eq!(r.diff_pixels, 0);
        assert_eq!(r.total_pixels, 100);
        assert!(
            r.image.pixels().all(|p| p.0[3] == 0),
            "overlay must stay transparent"
        );
    }

    #[test]
    fn single_pixel_difference_is_one_hundredth() {
        let a = solid(10, 10, GREY);
        let mut b = solid(10, 10, GREY);
        b.put_pixel(3, 7, Rgba([0, 0, 0, 255]));
        let r = diff_buffers(&a, &b);
        assert_eq!(r.diff_pixels, 1);
        assert!((r.difference - 0.01).abs() < 1e-12);
        assert_eq!(r.image.dimensions(), (10, 10));
        assert_eq!(*r.image.get_pixel(3, 7), Rgba([255, 0, 0, 255]));
        let marked = r.image.pixels().filter(|p| p.0[3] != 0).count();
        assert_eq!(marked, 1);
    }

    #[test]
    fn alpha_only_change_is_not_a_difference() {
        let a = solid(4, 4, Rgba([10, 20, 30, 255]));
        let b = solid(4, 4, Rgba([10, 20, 30, 0]));
        assert_eq!(diff_buffers(&a, &b).difference, 0.0);
    }

    #[test]
    fn width_mismatch_counts_the_margin() {
        // 10x10 vs 12x10, identical in the overlap: the 2x10 margin differs.
        let a = solid(10, 10, GREY);
        let b = solid(12, 10, GREY);
        let r = diff_buffers(&a, &b);
        assert_eq!(r.diff_pixels, 20);
        assert_eq!(r.total_pixels, 120);
        assert!((r.difference - 20.0 / 120.0).abs() < 1e-12);
        assert_eq!(r.image.dimensions(), (12, 10));
    }

    #[test]
    fn ratio_is_symmetric() {
        let mut a = solid(8, 8, GREY);
        let mut b = solid(8, 8, GREY);
        a.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        b.put_pixel(5, 5, Rgba([4, 5, 6, 255]));
        assert_eq!(
            diff_buffers(&a, &b).difference,
            diff_buffers(&b, &a).difference
        );
    }

    #[test]
    fn zero_area_input_is_fully_different() {
        let a = RgbaImage::new(0, 0);
        let r = diff_buffers(&a, &a.clone());
        assert_eq!(r.total_pixels, 0);
        assert_eq!(r.difference, 1.0);
    }

    // -- path-level short-circuits --

    #[test]
    fn same_path_short_circuits_without_decoding() {
        // The path does not exist; a decode attempt would fail loudly.
        let p = Path::new("does-not-exist.png");
        assert_eq!(diff_files(Some(p), Some(p), None).unwrap(), 0.0);
    }

    #[test]
    fn absent_paths_short_circuit() {
        let p = Path::new("does-not-exist.png");
        assert_eq!(diff_files(None, None, None).unwrap(), 0.0);
        assert_eq!(diff_files(Some(p), None, None).unwrap(), 1.0);
        assert_eq!(diff_files(None, Some(p), None).unwrap(), 1.0);
    }

    // -- file path --

    #[test]
    fn diff_files_writes_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.png");
        let b_path = dir.path().join("b.png");
        let out = dir.path().join("diff.png");
        solid(10, 10, GREY).save(&a_path).unwrap();
        let mut b = solid(10, 10, GREY);
        b.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        b.save(&b_path).unwrap();

        let difference = diff_files(Some(&a_path), Some(&b_path), Some(&out)).unwrap();
        assert!((difference - 0.01).abs() < 1e-12);

        let overlay = load_pixels(&out).unwrap();
        assert_eq!(overlay.dimensions(), (10, 10));
        assert_eq!(*overlay.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn unreadable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not a png").unwrap();
        let other = dir.path().join("ok.png");
        solid(2, 2, GREY).save(&other).unwrap();

        let err = diff_files(Some(&bogus), Some(&other), None).unwrap_err();
        assert!(matches!(err, CompareError::Decode { .. }));
    }
}
