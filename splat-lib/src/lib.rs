pub mod coalescer;
pub mod common;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ply;
pub mod sort;
pub mod store;
mod structures;
pub mod texture;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use coalescer::Coalescer;
pub use config::PipelineConfig;
pub use encoder::{encode_ply, importance_order};
pub use error::SplatError;
pub use ply::{PlyHeader, PropertyKind, RowReader, Schema};
pub use sort::{counting_sort, DepthSorter, SortOutcome};
pub use store::SplatStore;
pub use structures::{DepthIndex, SplatBuffer, SplatRecord, TextureBuffer, ViewProj};
pub use texture::{covariance, pack_texture};
pub use worker::{Inbound, Outbound, Worker};

cfg_if::cfg_if! {
if #[cfg(feature = "async")] {
    pub use worker::{spawn_worker, WorkerHandle};
}
}
