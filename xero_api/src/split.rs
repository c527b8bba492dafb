//! Order-preserving slice partitioning used to plan batched writes.
//!
//! Both functions borrow sub-slices of the input, so concatenating the
//! returned parts in order always reproduces the input exactly.

/// Splits `items` into consecutive parts of at most `chunk_size` elements.
///
/// A `chunk_size` of zero is treated as one. An empty input yields no parts.
pub fn split_by_chunk_size<T>(items: &[T], chunk_size: usize) -> Vec<&[T]> {
    items.chunks(chunk_size.max(1)).collect()
}

/// Splits `items` into `parts` consecutive parts of equal size, with the last
/// part absorbing any remainder.
///
/// Every part but the last has `len / parts` elements. `parts < 2` returns
/// the input as a single part, and `parts` larger than the input is clamped
/// so that no part is empty.
pub fn split_into_n_parts<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    if parts < 2 {
        return vec![items];
    }
    let parts = parts.min(items.len());
    if parts == 0 {
        return Vec::new();
    }

    let base = items.len() / parts;
    let mut out = Vec::with_capacity(parts);
    let mut rest = items;
    for _ in 1..parts {
        let (head, tail) = rest.split_at(base);
        out.push(head);
        rest = tail;
    }
    out.push(rest);
    out
}
