use std::ops::Range;

// ── Ordered search ───────────────────────────────────────────────

/// Restrict `bounds` to a valid sub-range of a slice of length `len`.
fn clamp_bounds(bounds: Range<usize>, len: usize) -> Range<usize> {
    let hi = bounds.end.min(len);
    let lo = bounds.start.min(hi);
    lo..hi
}

/// Insertion index for `key` within `items[bounds]` such that every element
/// before it has a key <= `key`. Equal keys are skipped, so inserting at the
/// returned index places the new element after the rightmost equal one.
///
/// `items` must be sorted by `key_of` within `bounds`. Out-of-range bounds are
/// clamped to the slice.
pub fn search_rightmost_in<T, K, F>(items: &[T], bounds: Range<usize>, key: &K, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let bounds = clamp_bounds(bounds, items.len());
    let lo = bounds.start;
    items
        .get(bounds)
        .map_or(lo, |window| lo + window.partition_point(|item| key_of(item) <= *key))
}

/// Insertion index for `key` within `items[bounds]` such that every element
/// before it has a key < `key` (before the leftmost equal key).
pub fn search_leftmost_in<T, K, F>(items: &[T], bounds: Range<usize>, key: &K, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let bounds = clamp_bounds(bounds, items.len());
    let lo = bounds.start;
    items
        .get(bounds)
        .map_or(lo, |window| lo + window.partition_point(|item| key_of(item) < *key))
}

/// [`search_rightmost_in`] over the whole slice.
pub fn search_rightmost<T, K, F>(items: &[T], key: &K, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    search_rightmost_in(items, 0..items.len(), key, key_of)
}

/// [`search_leftmost_in`] over the whole slice.
pub fn search_leftmost<T, K, F>(items: &[T], key: &K, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    search_leftmost_in(items, 0..items.len(), key, key_of)
}

/// Insert `item` keeping `items` sorted by `key_of`. Items with equal keys keep
/// insertion order (the new item goes after existing equal keys).
pub fn insert_sorted<T, K, F>(items: &mut Vec<T>, item: T, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let key = key_of(&item);
    let index = search_rightmost(items, &key, key_of);
    items.insert(index, item);
    index
}

/// Insert `item` before any existing items with an equal key.
pub fn insert_sorted_left<T, K, F>(items: &mut Vec<T>, item: T, key_of: F) -> usize
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let key = key_of(&item);
    let index = search_leftmost(items, &key, key_of);
    items.insert(index, item);
    index
}

// ── Numeric helpers ──────────────────────────────────────────────

/// Linearly map `value` from the range `from_start..from_end` onto
/// `to_start..to_end`. Not clamped.
pub fn remap(value: f64, from_start: f64, from_end: f64, to_start: f64, to_end: f64) -> f64 {
    (value - from_start) / (from_end - from_start) * (to_end - to_start) + to_start
}

/// [`remap`] with the result clamped to the target range (either direction).
pub fn remap_clamped(value: f64, from_start: f64, from_end: f64, to_start: f64, to_end: f64) -> f64 {
    let mapped = remap(value, from_start, from_end, to_start, to_end);
    mapped.clamp(to_start.min(to_end), to_start.max(to_end))
}
