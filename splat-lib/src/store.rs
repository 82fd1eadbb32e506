use crate::structures::{SplatBuffer, SplatRecord};
use log::warn;

/// The current splat buffer and how many of its records are live.
#[derive(Debug, Default)]
pub struct SplatStore {
    buffer: SplatBuffer,
    vertex_count: usize,
}

impl SplatStore {
    pub fn new(buffer: SplatBuffer) -> Self {
        let vertex_count = buffer.len();
        Self {
            buffer,
            vertex_count,
        }
    }

    pub fn replace(&mut self, buffer: SplatBuffer) {
        self.vertex_count = buffer.len();
        self.buffer = buffer;
    }

    /// Never exceeds the records actually present in the buffer.
    pub fn set_vertex_count(&mut self, vertex_count: usize) {
        let capacity = self.buffer.len();
        if vertex_count > capacity {
            warn!(
                "Vertex count {} exceeds buffer capacity {}, clamping",
                vertex_count, capacity
            );
        }
        self.vertex_count = vertex_count.min(capacity);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn buffer(&self) -> &SplatBuffer {
        &self.buffer
    }

    /// Live records, in buffer order.
    pub fn records(&self) -> impl Iterator<Item = SplatRecord> + '_ {
        self.buffer.records().take(self.vertex_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(n: usize) -> SplatBuffer {
        let records = vec![
            SplatRecord {
                position: [0.0; 3],
                scale: [1.0; 3],
                color: [0; 4],
                rotation: [255, 128, 128, 128],
            };
            n
        ];
        SplatBuffer::from_records(&records)
    }

    #[test]
    fn test_replace_resets_count() {
        let mut store = SplatStore::new(buffer_of(4));
        store.set_vertex_count(2);
        assert_eq!(store.records().count(), 2);
        store.replace(buffer_of(7));
        assert_eq!(store.vertex_count(), 7);
    }

    #[test]
    fn test_vertex_count_is_clamped() {
        let mut store = SplatStore::new(buffer_of(3));
        store.set_vertex_count(10);
        assert_eq!(store.vertex_count(), 3);
    }
}
