//! Pure numeric helpers shared by change construction and output splitting.
//!
//! # Determinism
//!
//! Both helpers are fully deterministic. `partition_natural` breaks residual
//! ties by ascending index; `pad_coalesce` returns its result in ascending
//! order.

/// Split `value` into one share per weight, proportionally.
///
/// Each share starts at `floor(value * w_i / sum(w))`; the residual units
/// are then handed out one at a time to the positions with the largest
/// fractional remainders, remaining ties broken by ascending index. The
/// shares always sum to `value` exactly, and each share lies within
/// `[floor(value * w_i / sum(w)), ceil(value * w_i / sum(w))]`.
///
/// Returns `None` iff `weights` is empty or all weights are zero.
#[must_use]
pub fn partition_natural(value: u64, weights: &[u64]) -> Option<Vec<u64>> {
    let total: u128 = weights.iter().map(|weight| u128::from(*weight)).sum();
    if total == 0 {
        return None;
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: u64 = 0;
    for (index, weight) in weights.iter().enumerate() {
        let scaled = u128::from(value) * u128::from(*weight);
        let share = u64::try_from(scaled / total).expect("floor share cannot exceed value");
        shares.push(share);
        remainders.push((scaled % total, index));
        assigned += share;
    }

    // Residual units go to the largest fractional remainders first.
    let mut residual = value - assigned;
    remainders.sort_by(|(ra, ia), (rb, ib)| rb.cmp(ra).then(ia.cmp(ib)));
    for (_, index) in remainders {
        if residual == 0 {
            break;
        }
        shares[index] += 1;
        residual -= 1;
    }

    Some(shares)
}

/// Adjust a non-empty list of values to exactly `target_len` entries while
/// preserving its total.
///
/// Short lists are padded with zeros; long lists repeatedly merge their two
/// smallest entries. The result is sorted ascending, so when the values are
/// per-source quantities of one asset, the largest concentrations stay in
/// the fewest positions.
///
/// # Panics
///
/// Panics when `values` is empty or `target_len` is zero; both are
/// programming errors at the call site.
#[must_use]
pub fn pad_coalesce(values: &[u64], target_len: usize) -> Vec<u64> {
    assert!(!values.is_empty(), "pad_coalesce requires at least one value");
    assert!(target_len > 0, "pad_coalesce requires a positive target length");

    let mut adjusted: Vec<u64> = values.to_vec();
    adjusted.sort_unstable();

    while adjusted.len() > target_len {
        let smallest = adjusted.remove(0);
        let merged = adjusted[0]
            .checked_add(smallest)
            .expect("asset quantity overflow while coalescing");
        adjusted.remove(0);
        let position = adjusted.partition_point(|existing| *existing < merged);
        adjusted.insert(position, merged);
    }

    if adjusted.len() < target_len {
        let padding = target_len - adjusted.len();
        let mut padded = vec![0; padding];
        padded.extend(adjusted);
        adjusted = padded;
    }

    adjusted
}
