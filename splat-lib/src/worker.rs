//! Message boundary between the host (UI / renderer) and the splat worker.
//!
//! All worker state lives in one [`Worker`] value that only [`Worker::handle`]
//! and [`Worker::complete_sort`] mutate. Buffers leaving the worker are moved
//! into [`Outbound`] messages, so the worker keeps no handle to anything it
//! has sent.

use crate::coalescer::Coalescer;
use crate::config::PipelineConfig;
use crate::encoder::encode_ply;
use crate::error::SplatError;
use crate::sort::{DepthSorter, SortOutcome};
use crate::store::SplatStore;
use crate::structures::{DepthIndex, SplatBuffer, TextureBuffer, ViewProj};
use crate::texture::pack_texture;
use log::{debug, info};

#[derive(Debug)]
pub enum Inbound {
    /// A raw PLY file to ingest. `save` is echoed back with the result.
    File { bytes: Vec<u8>, save: bool },
    /// An already encoded splat buffer.
    Buffer(SplatBuffer),
    /// Number of live splats, e.g. while a buffer is still streaming in.
    VertexCount(usize),
    /// The camera moved.
    View(ViewProj),
}

#[derive(Debug)]
pub enum Outbound {
    TextureReady(TextureBuffer),
    SortReady {
        depth_index: DepthIndex,
        view_proj: ViewProj,
        vertex_count: usize,
    },
    IngestReady {
        buffer: SplatBuffer,
        save: bool,
    },
    Failed(SplatError),
}

#[derive(Debug)]
pub struct Worker {
    config: PipelineConfig,
    store: SplatStore,
    sorter: DepthSorter,
    coalescer: Coalescer<ViewProj>,
    textured_vertex_count: Option<usize>,
}

impl Worker {
    pub fn new(config: PipelineConfig) -> Result<Self, SplatError> {
        config.validate()?;
        Ok(Self {
            config,
            store: SplatStore::default(),
            sorter: DepthSorter::new(config.similarity_epsilon),
            coalescer: Coalescer::new(),
            textured_vertex_count: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &SplatStore {
        &self.store
    }

    /// True while a sort has run and its completion has not been processed.
    pub fn is_busy(&self) -> bool {
        self.coalescer.is_busy()
    }

    /// Handles one inbound message.
    pub fn handle(&mut self, message: Inbound) -> Result<Vec<Outbound>, SplatError> {
        match message {
            Inbound::File { bytes, save } => {
                let buffer = encode_ply(&bytes, &self.config)?;
                self.replace_buffer(buffer.clone());
                Ok(vec![Outbound::IngestReady { buffer, save }])
            }
            Inbound::Buffer(buffer) => {
                self.replace_buffer(buffer);
                Ok(Vec::new())
            }
            Inbound::VertexCount(vertex_count) => {
                self.store.set_vertex_count(vertex_count);
                Ok(Vec::new())
            }
            Inbound::View(view) => match self.coalescer.request(view) {
                Some(view) => Ok(self.run_sort(view)),
                None => {
                    debug!("Sort in progress, parking latest view");
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Continuation after a sort: resorts for the newest parked view if it
    /// differs from the one just processed, otherwise goes idle.
    pub fn complete_sort(&mut self) -> Vec<Outbound> {
        match self.coalescer.complete() {
            Some(view) => self.run_sort(view),
            None => Vec::new(),
        }
    }

    fn replace_buffer(&mut self, buffer: SplatBuffer) {
        info!("Splat buffer replaced, {} splats", buffer.len());
        self.store.replace(buffer);
        self.sorter.reset();
        self.textured_vertex_count = None;
    }

    fn run_sort(&mut self, view: ViewProj) -> Vec<Outbound> {
        let mut out = Vec::new();
        let vertex_count = self.store.vertex_count();

        if self.textured_vertex_count != Some(vertex_count) {
            let texture = match pack_texture(&self.store, self.config.texture_width) {
                Ok(texture) => texture,
                Err(e) => {
                    out.push(Outbound::Failed(e));
                    return out;
                }
            };
            info!(
                "Texture {}x{} for {} splats",
                texture.width, texture.height, vertex_count
            );
            out.push(Outbound::TextureReady(texture));
            self.textured_vertex_count = Some(vertex_count);
        }

        match self.sorter.sort(&self.store, &view) {
            SortOutcome::Sorted(depth_index) => out.push(Outbound::SortReady {
                depth_index,
                view_proj: view,
                vertex_count,
            }),
            SortOutcome::Unchanged => {}
        }
        out
    }
}

cfg_if::cfg_if! {
if #[cfg(feature = "async")] {
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
    use tokio::task::JoinHandle;

    /// Host side of a worker running as a tokio task.
    pub struct WorkerHandle {
        pub inbound: UnboundedSender<Inbound>,
        pub outbound: UnboundedReceiver<Outbound>,
        pub task: JoinHandle<()>,
    }

    /// Spawns the worker on the current tokio runtime.
    ///
    /// The task exits once every `inbound` sender is dropped.
    pub fn spawn_worker(config: PipelineConfig) -> Result<WorkerHandle, SplatError> {
        let worker = Worker::new(config)?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(worker, inbound_rx, outbound_tx));
        Ok(WorkerHandle {
            inbound: inbound_tx,
            outbound: outbound_rx,
            task,
        })
    }

    fn dispatch(worker: &mut Worker, message: Inbound, tx: &UnboundedSender<Outbound>) {
        let replies = worker
            .handle(message)
            .unwrap_or_else(|e| vec![Outbound::Failed(e)]);
        send_all(replies, tx);
    }

    fn send_all(replies: Vec<Outbound>, tx: &UnboundedSender<Outbound>) {
        for reply in replies {
            if tx.send(reply).is_err() {
                debug!("Host dropped the outbound channel");
                return;
            }
        }
    }

    async fn run(
        mut worker: Worker,
        mut rx: UnboundedReceiver<Inbound>,
        tx: UnboundedSender<Outbound>,
    ) {
        while let Some(message) = rx.recv().await {
            dispatch(&mut worker, message, &tx);

            while worker.is_busy() {
                tokio::task::yield_now().await;
                while let Ok(message) = rx.try_recv() {
                    dispatch(&mut worker, message, &tx);
                }
                send_all(worker.complete_sort(), &tx);
            }
        }
        debug!("Inbound channel closed, worker exiting");
    }
}
}
