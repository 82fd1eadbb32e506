use crate::common::ROW_LENGTH;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// One encoded splat. Floats are stored in native byte order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SplatRecord {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub color: [u8; 4],
    pub rotation: [u8; 4],
}

const _: () = assert!(size_of::<SplatRecord>() == ROW_LENGTH);

/// Contiguous run of [`SplatRecord`]s.
///
/// The buffer has exactly one owner. Handing it across the worker boundary
/// moves it; `into_bytes` consumes the handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplatBuffer {
    bytes: Vec<u8>,
}

impl SplatBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub(crate) fn from_records(records: &[SplatRecord]) -> Self {
        Self {
            bytes: records.as_bytes().to_vec(),
        }
    }

    /// Number of whole records; trailing bytes are ignored.
    pub fn len(&self) -> usize {
        self.bytes.len() / ROW_LENGTH
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn record(&self, index: usize) -> Option<SplatRecord> {
        let start = index.checked_mul(ROW_LENGTH)?;
        let chunk = self.bytes.get(start..start.checked_add(ROW_LENGTH)?)?;
        SplatRecord::read_from_bytes(chunk).ok()
    }

    pub fn records(&self) -> impl Iterator<Item = SplatRecord> + '_ {
        self.bytes
            .chunks_exact(ROW_LENGTH)
            .filter_map(|chunk| SplatRecord::read_from_bytes(chunk).ok())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewProj(pub [f32; 16]);

impl ViewProj {
    /// The viewing-direction coefficients used for depth (entries 2, 6, 10).
    #[inline]
    pub fn depth_axis(&self) -> [f32; 3] {
        [self.0[2], self.0[6], self.0[10]]
    }
}

impl From<[f32; 16]> for ViewProj {
    fn from(m: [f32; 16]) -> Self {
        Self(m)
    }
}

/// Back-to-front draw order: a permutation of `0..vertex_count`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepthIndex(Vec<u32>);

impl DepthIndex {
    pub(crate) fn new(order: Vec<u32>) -> Self {
        Self(order)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

/// RGBA32UI texture: `width * height` texels, four words each.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBuffer {
    pub data: Vec<u32>,
    pub width: usize,
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: f32) -> SplatRecord {
        SplatRecord {
            position: [x, 0.0, 0.0],
            scale: [1.0; 3],
            color: [255; 4],
            rotation: [255, 128, 128, 128],
        }
    }

    #[test]
    fn test_record_lookup() {
        let buffer = SplatBuffer::from_records(&[record(1.0), record(2.0)]);
        assert_eq!(buffer.record(1), Some(record(2.0)));
        assert_eq!(buffer.record(2), None);
    }

    #[test]
    fn test_record_out_of_range_index() {
        let buffer = SplatBuffer::from_records(&[record(1.0)]);
        // The start offset fits in usize but the end does not.
        assert_eq!(buffer.record(usize::MAX / ROW_LENGTH), None);
        assert_eq!(buffer.record(usize::MAX), None);
    }
}
