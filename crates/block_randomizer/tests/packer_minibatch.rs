//! End-to-end packing: randomizer feeding the frame-mode packer.

mod common;
use common::{frame_randomizer, sample_bytes, RecordingDeserializer, SAMPLE_ELEMENTS};

use anyhow::Result;
use block_randomizer::{
    BlockRandomizer, ElementType, EpochConfiguration, FrameModePacker, RandomizerConfig,
    RandomizerError, SequenceProvider, StorageKind, StreamDescription,
};

#[test]
fn minibatch_bytes_concatenate_frames_in_yielded_order() -> Result<()> {
    // A twin randomizer with the same setup predicts the yielded ids.
    let (mut twin, _) = frame_randomizer(4, 4, 8)?;
    twin.start_epoch(&EpochConfiguration::default())?;
    let expected_ids = twin.next_sequences(3)?.ids;

    let (randomizer, _) = frame_randomizer(4, 4, 8)?;
    let mut packer = FrameModePacker::new(Box::new(randomizer), 3)?;
    packer.start_epoch(&EpochConfiguration::default())?;

    let minibatch = packer.read_minibatch()?;
    assert_eq!(minibatch.streams.len(), 1);
    let stream = &minibatch.streams[0];
    assert_eq!(stream.layout.num_parallel, 3);
    assert_eq!(stream.layout.num_time_steps, 1);
    assert_eq!(stream.byte_size(), 3 * SAMPLE_ELEMENTS * 4);

    let expected: Vec<u8> = expected_ids
        .iter()
        .flat_map(|&id| sample_bytes(id))
        .collect();
    assert_eq!(stream.data, expected.as_slice());
    Ok(())
}

#[test]
fn reading_before_start_epoch_underflows() -> Result<()> {
    let (randomizer, _) = frame_randomizer(2, 2, 4)?;
    let mut packer = FrameModePacker::new(Box::new(randomizer), 2)?;
    assert!(matches!(
        packer.read_minibatch(),
        Err(RandomizerError::EpochUnderflow)
    ));
    Ok(())
}

#[test]
fn sparse_streams_are_scattered_into_dense_slots() -> Result<()> {
    let streams = vec![
        StreamDescription::new("features", SAMPLE_ELEMENTS, ElementType::Float32, StorageKind::Dense),
        StreamDescription::new("labels", SAMPLE_ELEMENTS, ElementType::Float32, StorageKind::SparseCsc),
    ];
    let deserializer = RecordingDeserializer::frame_mode(2, 2).with_streams(streams);
    let randomizer = BlockRandomizer::new(
        RandomizerConfig::builder()
            .randomization_range_in_samples(4)
            .build(),
        Box::new(deserializer),
    )?;

    let (mut twin, _) = frame_randomizer(2, 2, 4)?;
    twin.start_epoch(&EpochConfiguration::default())?;
    let expected_ids = twin.next_sequences(4)?.ids;

    let mut packer = FrameModePacker::new(Box::new(randomizer), 4)?;
    packer.start_epoch(&EpochConfiguration::default())?;
    let minibatch = packer.read_minibatch()?;
    assert_eq!(minibatch.streams.len(), 2);

    // Dense stream: frames back to back.
    let expected_dense: Vec<u8> = expected_ids
        .iter()
        .flat_map(|&id| sample_bytes(id))
        .collect();
    assert_eq!(minibatch.streams[0].data, expected_dense.as_slice());

    // Sparse stream: one non-zero per frame, at row id % elements.
    let values: &[f32] = bytemuck::cast_slice(minibatch.streams[1].data);
    for (i, &id) in expected_ids.iter().enumerate() {
        let slot = &values[i * SAMPLE_ELEMENTS..(i + 1) * SAMPLE_ELEMENTS];
        for (row, &value) in slot.iter().enumerate() {
            let expected = if row == id % SAMPLE_ELEMENTS {
                id as f32
            } else {
                0.0
            };
            assert_eq!(value, expected, "frame {i}, row {row}");
        }
    }
    Ok(())
}

#[test]
fn the_final_partial_batch_shrinks_and_flags_the_epoch_end() -> Result<()> {
    let (randomizer, _) = frame_randomizer(2, 2, 4)?;
    let mut packer = FrameModePacker::new(Box::new(randomizer), 3)?;
    packer.start_epoch(&EpochConfiguration::default())?;

    let first = packer.read_minibatch()?;
    assert!(!first.at_end_of_epoch);
    assert_eq!(first.streams[0].layout.num_parallel, 3);

    let second = packer.read_minibatch()?;
    assert!(second.at_end_of_epoch);
    assert_eq!(second.streams[0].layout.num_parallel, 1);
    assert_eq!(second.streams[0].byte_size(), SAMPLE_ELEMENTS * 4);

    let terminal = packer.read_minibatch()?;
    assert!(terminal.at_end_of_epoch);
    assert!(terminal.streams.is_empty());
    Ok(())
}
