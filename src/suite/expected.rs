//! Hand-computed results for the collective cases.
//!
//! The variable-count collectives all use the same triangular layout: rank
//! `i` contributes `i + 1` elements placed at offset `summation(i)`, so a
//! full buffer for `n` ranks holds `summation(n)` elements.

/// `0 + 1 + ... + n`; zero for negative `n`.
pub fn summation(n: i32) -> i32 {
    if n <= 0 {
        0
    } else {
        n * (n + 1) / 2
    }
}

/// Receive counts and displacements of the triangular layout.
pub fn triangular_layout(size: i32) -> (Vec<i32>, Vec<i32>) {
    let counts = (0..size).map(|i| i + 1).collect();
    let displs = (0..size).map(summation).collect();
    (counts, displs)
}

/// Locate `index` in the triangular layout: the contributing rank and the
/// position inside that rank's block.
fn block_of(index: usize) -> (usize, usize) {
    let mut block = 0usize;
    let mut start = 0usize;
    while start + block < index {
        start += block + 1;
        block += 1;
    }
    (block, index - start)
}

/// Sum over all ranks of `rank * 10`, the reduce and allreduce result.
pub fn reduce_total(size: i32) -> f64 {
    (0..size).map(|i| f64::from(i * 10)).sum()
}

/// The `rank + 1` values a rank contributes to gatherv and allgatherv.
pub fn gatherv_contribution(rank: i32) -> Vec<f64> {
    (0..=rank).map(|i| f64::from(10 * (rank + 1) + i)).collect()
}

/// Expected gatherv element at `index`, derived from the value received.
///
/// With `j = index + 1`: if `received` (truncated to an integer) is a
/// multiple of `10 * j` the element must be `10 * j`, otherwise it must be
/// the remainder itself.
pub fn gatherv_expected(received: f64, index: usize) -> f64 {
    let j = index as i32 + 1;
    let remainder = (received as i32) % (10 * j);
    if remainder == 0 {
        f64::from(10 * j)
    } else {
        f64::from(remainder)
    }
}

/// The full buffer root scatters in the scatterv case.
pub fn scatterv_source(size: i32) -> Vec<f64> {
    (0..summation(size)).map(|i| f64::from(10 * (i + 1))).collect()
}

/// The `rank + 1` values `rank` receives from scatterv.
pub fn scatterv_expected(rank: i32) -> Vec<f64> {
    (0..=rank)
        .map(|i| f64::from(summation(rank) * 10 + 10 * (i + 1)))
        .collect()
}

/// Which peer's data lands at `index` of an alltoallv receive buffer.
pub fn compute_base(index: usize) -> f64 {
    block_of(index).0 as f64
}

/// The low part of the alltoallv element at `index` on `rank`.
///
/// Peer `b` sends `b + 1` consecutive values starting at
/// `rank * (b + 1)` (plus `100 * b`, see [`compute_base`]).
pub fn compute_value(rank: i32, index: usize) -> f64 {
    let (block, offset) = block_of(index);
    f64::from(rank) * (block as f64 + 1.0) + offset as f64
}

/// What `rank` sends in the alltoallv case: `rank + 1` values to each peer.
pub fn alltoallv_source(rank: i32, size: i32) -> Vec<f64> {
    (0..(rank + 1) * size)
        .map(|i| f64::from(rank * 100 + i))
        .collect()
}

/// The full alltoallv receive buffer expected on `rank`.
pub fn alltoallv_expected(rank: i32, size: i32) -> Vec<f64> {
    (0..summation(size) as usize)
        .map(|i| 100.0 * compute_base(i) + compute_value(rank, i))
        .collect()
}

/// Reduce-scatter result on `rank`: sum over ranks `i` of `i * size + rank`.
pub fn reduce_scatter_expected(rank: i32, size: i32) -> f64 {
    (0..size).map(|i| f64::from(i * size + rank)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summation_is_triangular() {
        assert_eq!(summation(0), 0);
        assert_eq!(summation(1), 1);
        assert_eq!(summation(4), 10);
        assert_eq!(summation(10), 55);
        assert_eq!(summation(-3), 0);
    }

    #[test]
    fn triangular_layout_for_four_ranks() {
        let (counts, displs) = triangular_layout(4);
        assert_eq!(counts, vec![1, 2, 3, 4]);
        assert_eq!(displs, vec![0, 1, 3, 6]);
    }

    #[test]
    fn block_of_walks_triangular_blocks() {
        assert_eq!(block_of(0), (0, 0));
        assert_eq!(block_of(1), (1, 0));
        assert_eq!(block_of(2), (1, 1));
        assert_eq!(block_of(3), (2, 0));
        assert_eq!(block_of(5), (2, 2));
        assert_eq!(block_of(6), (3, 0));
    }

    #[test]
    fn reduce_total_sums_scaled_ranks() {
        assert_eq!(reduce_total(4), 60.0);
        assert_eq!(reduce_total(1), 0.0);
    }

    /// The buffer gatherv assembles at root for `size` ranks.
    fn gathered(size: i32) -> Vec<f64> {
        (0..size).flat_map(gatherv_contribution).collect()
    }

    #[test]
    fn gatherv_contribution_for_four_ranks() {
        assert_eq!(
            gathered(4),
            vec![10.0, 20.0, 21.0, 30.0, 31.0, 32.0, 40.0, 41.0, 42.0, 43.0]
        );
    }

    #[test]
    fn gatherv_rule_accepts_a_correct_gather() {
        for size in 4..=8 {
            for (i, &v) in gathered(size).iter().enumerate() {
                assert_eq!(gatherv_expected(v, i), v, "size {size} index {i}");
            }
        }
    }

    #[test]
    fn gatherv_rule_rejects_untouched_buffer() {
        assert_ne!(gatherv_expected(0.0, 0), 0.0);
        assert_ne!(gatherv_expected(0.0, 5), 0.0);
    }

    #[test]
    fn scatterv_pieces_match_source_slices() {
        let size = 5;
        let source = scatterv_source(size);
        let (counts, displs) = triangular_layout(size);
        for rank in 0..size {
            let start = displs[rank as usize] as usize;
            let end = start + counts[rank as usize] as usize;
            assert_eq!(scatterv_expected(rank), source[start..end].to_vec());
        }
    }

    #[test]
    fn alltoallv_matches_documented_tables() {
        assert_eq!(
            alltoallv_expected(0, 4),
            vec![0.0, 100.0, 101.0, 200.0, 201.0, 202.0, 300.0, 301.0, 302.0, 303.0]
        );
        assert_eq!(
            alltoallv_expected(1, 4),
            vec![1.0, 102.0, 103.0, 203.0, 204.0, 205.0, 304.0, 305.0, 306.0, 307.0]
        );
        assert_eq!(
            alltoallv_expected(2, 4),
            vec![2.0, 104.0, 105.0, 206.0, 207.0, 208.0, 308.0, 309.0, 310.0, 311.0]
        );
    }

    #[test]
    fn alltoallv_expected_is_what_peers_send() {
        // Simulate the exchange: peer b sends block r of its source to rank r
        let size = 6;
        for rank in 0..size {
            let mut simulated = Vec::new();
            for peer in 0..size {
                let chunk = (peer + 1) as usize;
                let source = alltoallv_source(peer, size);
                let start = chunk * rank as usize;
                simulated.extend_from_slice(&source[start..start + chunk]);
            }
            assert_eq!(alltoallv_expected(rank, size), simulated, "rank {rank}");
        }
    }

    #[test]
    fn compute_base_and_value_split_an_element() {
        assert_eq!(compute_base(4), 2.0);
        assert_eq!(compute_value(1, 4), 4.0);
        assert_eq!(compute_value(3, 0), 3.0);
    }

    #[test]
    fn reduce_scatter_expected_for_four_ranks() {
        // rank 2: 0*4+2 + 1*4+2 + 2*4+2 + 3*4+2
        assert_eq!(reduce_scatter_expected(2, 4), 32.0);
        assert_eq!(reduce_scatter_expected(0, 4), 24.0);
    }
}
