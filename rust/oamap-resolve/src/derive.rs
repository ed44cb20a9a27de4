//! Buffers derived from the stored ones during resolution.

use oamap_buffers::{Array, NullMask, SharedVec};
use oamap_common::{Result, error::Error};

/// The `uint64` values of an index array.
pub(crate) fn index_values<'a>(array: &'a Array, key: &str) -> Result<&'a SharedVec<u64>> {
    array
        .typed::<u64>()
        .ok_or_else(|| Error::shape_mismatch(key, format!("expected uint64, found {}", array.dtype())))
}

/// Cumulative offsets of a counts buffer: `N + 1` entries with a zero head.
///
/// Masked counts contribute nothing.
pub fn offsets_from_counts(counts: &Array, key: &str) -> Result<Array> {
    let counts = counts.to_index_array(key)?;
    let values = index_values(&counts, key)?;
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut total = 0u64;
    offsets.push(total);
    for (i, &count) in values.iter().enumerate() {
        if !counts.is_null(i) {
            total = total
                .checked_add(count)
                .ok_or_else(|| Error::shape_mismatch(key, "counts overflow uint64"))?;
        }
        offsets.push(total);
    }
    Ok(Array::from_vec(offsets))
}

/// Splits an offsets buffer of `N + 1` entries into overlapping `begin` (`[:-1]`) and
/// `end` (`[1:]`) views without copying. `mask`, of length `N`, is attached to
/// `begin`.
pub fn boundary_views(offsets: &Array, mask: Option<NullMask>, key: &str) -> Result<(Array, Array)> {
    let offsets = offsets.to_index_array(key)?;
    let values = index_values(&offsets, key)?;
    let (begin, end) = values
        .boundary_views()
        .ok_or_else(|| Error::shape_mismatch(key, "an offsets buffer needs at least one entry"))?;
    let begin = Array::from_values(begin);
    let begin = match mask {
        Some(mask) => begin.with_mask(mask)?,
        None => begin,
    };
    Ok((begin, Array::from_values(end)))
}

/// Per-possibility offsets of a dense union: the entry at `i` is the rank of `i`
/// among the entries sharing its tag.
///
/// Masked entries get offset `0` and do not advance any counter.
///
/// # Errors
///
/// Fails with `ShapeMismatch` if an unmasked tag is not below `possibilities`.
pub fn union_offsets(tags: &Array, possibilities: usize, key: &str) -> Result<Array> {
    let tags = tags.to_index_array(key)?;
    let values = index_values(&tags, key)?;
    let mut counters = vec![0u64; possibilities];
    let offsets = values
        .iter()
        .enumerate()
        .map(|(i, &tag)| {
            if tags.is_null(i) {
                return Ok(0);
            }
            let counter = usize::try_from(tag)
                .ok()
                .and_then(|tag| counters.get_mut(tag))
                .ok_or_else(|| {
                    Error::shape_mismatch(
                        key,
                        format!("tag {tag} at {i} is not below {possibilities}"),
                    )
                })?;
            let offset = *counter;
            *counter += 1;
            Ok(offset)
        })
        .collect::<Result<Vec<u64>>>()?;
    Ok(Array::from_vec(offsets))
}
