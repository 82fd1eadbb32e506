use clap::Parser;
use log::{error, info};
use splat_lib::common::DEFAULT_TEXTURE_WIDTH;
use splat_lib::{spawn_worker, Inbound, Outbound, PipelineConfig, SplatBuffer, ViewProj};
use std::error::Error;
use std::fs;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "PLY to splat converter",
    version = "1.0",
    author = "Denis Avvakumov",
    about = "Converts PLY point clouds (splats) into fixed-stride splat buffers"
)]
struct Cli {
    #[arg(
        short = 'i',
        long = "input",
        value_name = "INPUT",
        required = true,
        help = "Path to the input file (.ply, or an encoded splat buffer)."
    )]
    input: String,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "OUTPUT",
        required = true,
        help = "Path to the output splat buffer."
    )]
    output: String,

    #[arg(
        long = "texture-width",
        value_name = "TEXELS",
        default_value_t = DEFAULT_TEXTURE_WIDTH,
        help = "Width of the packed splat texture."
    )]
    texture_width: usize,

    #[arg(
        long = "view",
        value_name = "MATRIX",
        value_delimiter = ',',
        allow_hyphen_values = true,
        help = "View-projection matrix (16 comma-separated floats) to pack and sort for."
    )]
    view: Option<Vec<f32>>,
}

fn is_ply(data: &[u8]) -> bool {
    data.starts_with(b"ply")
}

fn parse_view(values: Option<&[f32]>) -> Result<Option<ViewProj>, Box<dyn Error + Send + Sync>> {
    values
        .map(|m| -> Result<ViewProj, Box<dyn Error + Send + Sync>> {
            let m: [f32; 16] = m
                .try_into()
                .map_err(|_| format!("--view needs 16 values, got {}", m.len()))?;
            Ok(ViewProj(m))
        })
        .transpose()
}

async fn process_input(
    raw_data: Vec<u8>,
    config: PipelineConfig,
    view: Option<ViewProj>,
) -> Result<SplatBuffer, Box<dyn Error + Send + Sync>> {
    let mut worker = spawn_worker(config)?;

    let buffer = if is_ply(&raw_data) {
        worker.inbound.send(Inbound::File {
            bytes: raw_data,
            save: true,
        })?;
        match worker.outbound.recv().await {
            Some(Outbound::IngestReady { buffer, .. }) => buffer,
            Some(Outbound::Failed(e)) => return Err(Box::new(e)),
            other => return Err(format!("Unexpected worker reply: {:?}", other).into()),
        }
    } else {
        let buffer = SplatBuffer::from_bytes(raw_data);
        worker.inbound.send(Inbound::Buffer(buffer.clone()))?;
        buffer
    };
    info!("{} splats, {} bytes", buffer.len(), buffer.byte_len());

    if let Some(view) = view {
        worker.inbound.send(Inbound::View(view))?;
        let mut sorted = false;
        while !sorted {
            match worker.outbound.recv().await {
                Some(Outbound::TextureReady(texture)) => {
                    info!("Texture {}x{}", texture.width, texture.height)
                }
                Some(Outbound::SortReady { depth_index, .. }) => {
                    info!("Depth index with {} entries", depth_index.len());
                    sorted = true;
                }
                Some(Outbound::Failed(e)) => return Err(Box::new(e)),
                Some(other) => return Err(format!("Unexpected worker reply: {:?}", other).into()),
                None => return Err("Worker stopped before sorting".into()),
            }
        }
    }

    drop(worker.inbound);
    worker.task.await?;
    Ok(buffer)
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let raw_data = fs::read(&cli.input).unwrap_or_else(|e| {
        error!("Error reading input file {}: {}", cli.input, e);
        process::exit(1);
    });

    let config = PipelineConfig {
        texture_width: cli.texture_width,
        ..Default::default()
    };
    let view = parse_view(cli.view.as_deref())?;

    info!("Input: {} | Output: {}", cli.input, cli.output);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let start = Instant::now();

    let result = rt.block_on(process_input(raw_data, config, view))?.into_bytes();

    let elapsed = start.elapsed().as_millis();
    info!("Processing Time: {} ms", elapsed);

    fs::write(&cli.output, &result).unwrap_or_else(|e| {
        error!("Error writing output '{}': {}", cli.output, e);
        process::exit(1);
    });
    info!("Successfully wrote to '{}'.", cli.output);

    Ok(())
}
