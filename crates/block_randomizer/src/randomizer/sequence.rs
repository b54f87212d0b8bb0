//! Per-sweep sequence randomization: lays sequences out in shuffled-chunk
//! order, then shuffles them in place without moving any sequence outside
//! the randomization window of its position.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::RandomizerError;
use crate::randomizer::chunks::ChunkRandomization;
use crate::timeline::{SequenceDescription, TimelineIndex};

/// Produces the randomized timeline of one sweep.
///
/// The generator is seeded with `sweep + 1` so the sequence shuffle draws
/// from a stream distinct from the chunk shuffle of the same sweep.
pub fn randomize_sequences(
    timeline: &[SequenceDescription],
    index: &TimelineIndex,
    chunks: &ChunkRandomization,
    sweep: u64,
) -> Result<Vec<SequenceDescription>, RandomizerError> {
    // Baseline: walk chunks in shuffled order and copy each one's
    // sequences, rewriting the chunk id to the shuffled position. Every
    // position now trivially satisfies its window.
    let mut randomized = Vec::with_capacity(index.num_sequences);
    for k in 0..chunks.num_chunks() {
        let original_chunk_index = chunks.chunk(k).original_chunk_index;
        for position in index.sequence_range(original_chunk_index) {
            let mut description = timeline[position];
            description.chunk_id = k;
            randomized.push(description);
        }
    }
    debug_assert_eq!(randomized.len(), index.num_sequences);

    // Windowed shuffle. A draw is kept only when the two sequences remain
    // inside the windows of their destination positions; the identity swap
    // is always valid, so the loop terminates.
    let mut rng = StdRng::seed_from_u64(sweep.wrapping_add(1));
    for i in 0..randomized.len() {
        let k = chunks.chunk_for_sequence_position(i);
        let window = chunks.chunk(k);
        let position_begin = chunks.chunk(window.window_begin).sequence_position_start;
        let position_end = chunks.chunk(window.window_end).sequence_position_start;

        loop {
            let j = rng.random_range(position_begin..position_end);
            if !chunks.is_valid_for_position(i, &randomized[j]) {
                continue;
            }
            if !chunks.is_valid_for_position(j, &randomized[i]) {
                continue;
            }
            randomized.swap(i, j);
            break;
        }
    }

    for (position, description) in randomized.iter().enumerate() {
        if !chunks.is_valid_for_position(position, description) {
            return Err(RandomizerError::LogicMangledPermutation { position });
        }
    }

    Ok(randomized)
}
