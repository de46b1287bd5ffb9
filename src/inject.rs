//! Splicing a re-encoded sector back into the image it came from.

use crate::diag::{Diagnostics, Warning};
use crate::error::Error;
use crate::SectorLocation;

/// Filler written after a sector that shrank.
pub const PAD_BYTE: u8 = 0xFF;

/// Replace the region at `location` in `image` with `sector`.
///
/// A smaller sector is padded with [`PAD_BYTE`] up to the old region size.
/// A bigger one is refused with [`Error::Overflow`] unless `force` is set, in
/// which case it overwrites whatever follows the region and is truncated so
/// that the result is never longer than `image`. The returned buffer always
/// has the same length as `image`.
pub fn inject(
    image: &[u8],
    location: SectorLocation,
    sector: &[u8],
    force: bool,
    diag: &mut Diagnostics,
) -> Result<Vec<u8>, Error> {
    let SectorLocation {
        offset: start,
        region_length: old_size,
    } = location;
    if location.end() > image.len() {
        return Err(Error::Truncated {
            expected: location.end(),
            actual: image.len(),
        });
    }

    let new_size = sector.len();
    let mut blob = sector.to_vec();

    if new_size < old_size {
        let padding = old_size - new_size;
        tracing::debug!("padding the new sector with {padding} bytes");
        blob.resize(old_size, PAD_BYTE);
        diag.warn(Warning::InjectionPadded { padding });
    } else if new_size > old_size {
        if !force {
            return Err(Error::Overflow { new_size, old_size });
        }
        let excess = (start + new_size).saturating_sub(image.len());
        if excess > 0 {
            blob.truncate(new_size - excess);
            diag.warn(Warning::InjectionTruncated { excess });
        }
    }

    Ok(splice(image, start, &blob))
}

/// Copy of `image` with `image[start..start + replacement.len()]` replaced.
/// `replacement` must fit inside `image`.
pub fn splice(image: &[u8], start: usize, replacement: &[u8]) -> Vec<u8> {
    let end = start + replacement.len();
    let mut out = Vec::with_capacity(image.len());
    out.extend_from_slice(&image[..start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&image[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Vec<u8> {
        (0..=255u8).cycle().take(1000).collect()
    }

    fn region() -> SectorLocation {
        SectorLocation {
            offset: 100,
            region_length: 100,
        }
    }

    #[test]
    fn same_size_is_spliced() {
        let mut diag = Diagnostics::new();
        let out = inject(&image(), region(), &[0xAA; 100], false, &mut diag).unwrap();
        assert_eq!(out.len(), 1000);
        assert!(out[100..200].iter().all(|&b| b == 0xAA));
        assert_eq!(out[..100], image()[..100]);
        assert_eq!(out[200..], image()[200..]);
        assert!(diag.is_empty());
    }

    #[test]
    fn smaller_is_padded() {
        let mut diag = Diagnostics::new();
        let out = inject(&image(), region(), &[0xAA; 80], false, &mut diag).unwrap();
        assert_eq!(out.len(), 1000);
        assert!(out[100..180].iter().all(|&b| b == 0xAA));
        assert!(out[180..200].iter().all(|&b| b == PAD_BYTE));
        assert_eq!(out[200..], image()[200..]);
        assert!(diag.contains(&Warning::InjectionPadded { padding: 20 }));
    }

    #[test]
    fn larger_needs_force() {
        let mut diag = Diagnostics::new();
        assert_eq!(
            inject(&image(), region(), &[0xAA; 120], false, &mut diag),
            Err(Error::Overflow {
                new_size: 120,
                old_size: 100
            })
        );

        let out = inject(&image(), region(), &[0xAA; 120], true, &mut diag).unwrap();
        assert_eq!(out.len(), 1000);
        assert!(out[100..220].iter().all(|&b| b == 0xAA));
        assert_eq!(out[220..], image()[220..]);
        assert!(diag.is_empty());
    }

    #[test]
    fn forced_overflow_past_the_end_is_truncated() {
        let mut diag = Diagnostics::new();
        let location = SectorLocation {
            offset: 950,
            region_length: 30,
        };
        let out = inject(&image(), location, &[0xAA; 80], true, &mut diag).unwrap();
        assert_eq!(out.len(), 1000);
        assert!(out[950..].iter().all(|&b| b == 0xAA));
        assert!(diag.contains(&Warning::InjectionTruncated { excess: 30 }));
    }

    #[test]
    fn region_outside_image() {
        let mut diag = Diagnostics::new();
        let location = SectorLocation {
            offset: 990,
            region_length: 20,
        };
        assert_eq!(
            inject(&image(), location, &[0; 20], false, &mut diag),
            Err(Error::Truncated {
                expected: 1010,
                actual: 1000
            })
        );
    }
}
