//! Finding sector magics inside a firmware image.

use crate::error::Error;
use crate::SectorKind;

/// Alignment every genuine SFX blob header starts on.
pub const SFX_ALIGNMENT: usize = 0x80;

/// Yield the offset of every occurrence of `needle` in `haystack`, in
/// ascending order. Overlapping matches are reported.
pub fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len().max(1))
        .enumerate()
        .filter(move |(_, window)| !needle.is_empty() && *window == needle)
        .map(|(pos, _)| pos)
}

/// Find the first occurrence of `magic` and check that at least `min_size`
/// bytes are available from there.
pub fn find_exact(
    image: &[u8],
    magic: &[u8],
    min_size: usize,
    kind: SectorKind,
) -> Result<usize, Error> {
    let offset = find_all(image, magic)
        .next()
        .ok_or(Error::NotFound(kind))?;
    let available = image.len() - offset;
    if available < min_size {
        return Err(Error::Truncated {
            expected: min_size,
            actual: available,
        });
    }
    Ok(offset)
}

/// Find a header-table sector whose magic is too common to be trusted.
///
/// Candidates must start on [`SFX_ALIGNMENT`] and their `header_size`-byte
/// window must be more than 80% zero. The last `header_size` bytes of the
/// image are never searched.
pub fn find_by_zero_density(
    image: &[u8],
    magic: &[u8],
    header_size: usize,
    kind: SectorKind,
) -> Result<usize, Error> {
    let searchable = &image[..image.len().saturating_sub(header_size)];

    for offset in find_all(searchable, magic) {
        if offset % SFX_ALIGNMENT != 0 {
            tracing::debug!("candidate header at {offset:#x} is not aligned, keep searching");
            continue;
        }

        let window = &image[offset..offset + header_size];
        let zeroes = window.iter().filter(|&&b| b == 0).count();
        // zeroes / header_size > 0.8
        if zeroes * 5 <= header_size * 4 {
            tracing::debug!(
                "candidate header at {offset:#x} has only {zeroes} zero bytes, keep searching"
            );
            continue;
        }

        return Ok(offset);
    }

    Err(Error::NotFound(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_reports_overlapping_matches() {
        let found: Vec<_> = find_all(b"aaab", b"aa").collect();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn exact_requires_room_for_the_sector() {
        let image = b"xxMAGIC123";
        assert_eq!(find_exact(image, b"MAGIC", 8, SectorKind::BtInfo), Ok(2));
        assert_eq!(
            find_exact(image, b"MAGIC", 9, SectorKind::BtInfo),
            Err(Error::Truncated {
                expected: 9,
                actual: 8
            })
        );
        assert_eq!(
            find_exact(image, b"NOPE", 1, SectorKind::BtInfo),
            Err(Error::NotFound(SectorKind::BtInfo))
        );
    }
}
