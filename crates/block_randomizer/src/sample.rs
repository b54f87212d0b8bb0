//! Data model for the sample payloads flowing from the deserializer to the
//! packer: element types, storage kinds, per-stream descriptions, and the
//! per-sequence `SampleData` records returned by `fetch`.

/// Scalar element types that sample data may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Float64,
    Byte,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::Float32 => std::mem::size_of::<f32>(),
            ElementType::Float64 => std::mem::size_of::<f64>(),
            ElementType::Byte => std::mem::size_of::<u8>(),
        }
    }
}

/// Physical layout of a stream's sample records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Dense,
    SparseCsc,
}

/// Describes one stream of the dataset (e.g., `"features"`, `"labels"`).
///
/// A sample of the stream occupies `sample_elements` scalars of
/// `element_type`, laid out according to `storage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    pub name: String,
    pub sample_elements: usize,
    pub element_type: ElementType,
    pub storage: StorageKind,
}

impl StreamDescription {
    pub fn new(
        name: impl Into<String>,
        sample_elements: usize,
        element_type: ElementType,
        storage: StorageKind,
    ) -> Self {
        Self {
            name: name.into(),
            sample_elements,
            element_type,
            storage,
        }
    }

    /// Number of bytes one dense sample of this stream occupies.
    pub fn sample_size_in_bytes(&self) -> usize {
        self.sample_elements * self.element_type.size_in_bytes()
    }
}

/// Per-stream payload of one sequence, as returned by `Deserializer::fetch`.
///
/// Exactly two shapes exist; reimplementations of the deserializer must
/// produce one of them rather than downcasting to hidden record types.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    /// Contiguous samples, `num_samples * sample_size_in_bytes` bytes.
    Dense { bytes: Vec<u8>, num_samples: usize },
    /// Sparse column storage. `bytes` packs the non-zero elements of all
    /// frames back to back; `indices[frame][n]` is the row of the n-th
    /// non-zero of that frame.
    SparseCsc {
        bytes: Vec<u8>,
        indices: Vec<Vec<usize>>,
    },
}

impl SampleData {
    /// Number of samples (frames) in this record.
    pub fn num_samples(&self) -> usize {
        match self {
            SampleData::Dense { num_samples, .. } => *num_samples,
            SampleData::SparseCsc { indices, .. } => indices.len(),
        }
    }
}
