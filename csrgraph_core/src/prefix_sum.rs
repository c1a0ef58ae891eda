use rayon::prelude::*;

/// Elements per block in [`parallel_prefix_sum`].
pub const BLOCK_SIZE: usize = 1 << 20;

/// Offsets for `degrees`: `offsets[0] == 0`, `offsets[i + 1] = offsets[i] +
/// degrees[i]`, length `degrees.len() + 1`.
pub fn prefix_sum(degrees: &[usize]) -> Vec<usize> {
    let mut sums = Vec::with_capacity(degrees.len() + 1);
    let mut total = 0;
    sums.push(0);
    for &d in degrees {
        total += d;
        sums.push(total);
    }
    sums
}

/// Same result as [`prefix_sum`], computed block-wise in parallel.
pub fn parallel_prefix_sum(degrees: &[usize]) -> Vec<usize> {
    parallel_prefix_sum_with_block(degrees, BLOCK_SIZE)
}

pub(crate) fn parallel_prefix_sum_with_block(degrees: &[usize], block_size: usize) -> Vec<usize> {
    // Phase 1: per-block totals, no shared writes.
    let local_sums: Vec<usize> = degrees
        .par_chunks(block_size)
        .map(|block| block.iter().sum())
        .collect();

    // Phase 2: serial scan over the block totals.
    let mut bulk_prefix = Vec::with_capacity(local_sums.len());
    let mut total = 0;
    for s in &local_sums {
        bulk_prefix.push(total);
        total += s;
    }

    // Phase 3: every block writes its own outputs from its base.
    let mut prefix = vec![0; degrees.len() + 1];
    prefix[..degrees.len()]
        .par_chunks_mut(block_size)
        .zip(degrees.par_chunks(block_size))
        .zip(bulk_prefix.par_iter())
        .for_each(|((out, block), &base)| {
            let mut local_total = base;
            for (slot, &d) in out.iter_mut().zip(block) {
                *slot = local_total;
                local_total += d;
            }
        });
    prefix[degrees.len()] = total;
    prefix
}
