use crate::common::{DEPTH_BUCKETS, DEPTH_SCALE};
use crate::store::SplatStore;
use crate::structures::{DepthIndex, ViewProj};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum SortOutcome {
    Sorted(DepthIndex),
    /// The view barely moved; the previous depth index is still valid.
    Unchanged,
}

/// Depth sorter with memory of the last view it sorted for.
#[derive(Debug, Clone)]
pub struct DepthSorter {
    epsilon: f32,
    last_view: Option<ViewProj>,
    last_vertex_count: Option<usize>,
}

fn cosine_similarity(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let norm = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
        * (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return 0.0;
    }
    dot / norm
}

/// Single pass 16-bit counting sort over integer depths.
///
/// Returns point indices in ascending bucket order; points sharing a bucket
/// keep ascending index order. When every depth is equal all points land in
/// bucket 0.
pub fn counting_sort(depths: &[i32]) -> Vec<u32> {
    let (Some(&min), Some(&max)) = (depths.iter().min(), depths.iter().max()) else {
        return Vec::new();
    };
    let range = max as i64 - min as i64;
    let top = (DEPTH_BUCKETS - 1) as i64;

    let buckets: Vec<u16> = depths
        .iter()
        .map(|&d| {
            if range == 0 {
                0
            } else {
                ((d as i64 - min as i64) * top / range) as u16
            }
        })
        .collect();

    let mut starts = vec![0u32; DEPTH_BUCKETS];
    for &b in &buckets {
        starts[b as usize] += 1;
    }
    let mut total = 0u32;
    for slot in starts.iter_mut() {
        let count = *slot;
        *slot = total;
        total += count;
    }

    let mut order = vec![0u32; depths.len()];
    for (i, &b) in buckets.iter().enumerate() {
        let slot = &mut starts[b as usize];
        order[*slot as usize] = i as u32;
        *slot += 1;
    }
    order
}

impl DepthSorter {
    pub fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            last_view: None,
            last_vertex_count: None,
        }
    }

    /// Forgets the last sorted view, so the next call always sorts.
    pub fn reset(&mut self) {
        self.last_view = None;
        self.last_vertex_count = None;
    }

    pub fn last_view(&self) -> Option<&ViewProj> {
        self.last_view.as_ref()
    }

    /// Only rotation is compared; a pure translation is not detected.
    fn can_skip(&self, view: &ViewProj, vertex_count: usize) -> bool {
        match (&self.last_view, self.last_vertex_count) {
            (Some(last), Some(count)) if count == vertex_count => {
                cosine_similarity(last.depth_axis(), view.depth_axis()) > 1.0 - self.epsilon
            }
            _ => false,
        }
    }

    pub fn sort(&mut self, store: &SplatStore, view: &ViewProj) -> SortOutcome {
        let vertex_count = store.vertex_count();
        if self.can_skip(view, vertex_count) {
            debug!("View within similarity threshold, skipping sort");
            return SortOutcome::Unchanged;
        }

        let [vx, vy, vz] = view.depth_axis();
        let depths: Vec<i32> = store
            .records()
            .map(|r| {
                let [x, y, z] = r.position;
                ((vx * x + vy * y + vz * z) * DEPTH_SCALE).floor() as i32
            })
            .collect();

        let order = counting_sort(&depths);
        self.last_view = Some(*view);
        self.last_vertex_count = Some(vertex_count);
        SortOutcome::Sorted(DepthIndex::new(order))
    }
}
