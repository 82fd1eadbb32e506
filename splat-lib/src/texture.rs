use crate::common::{pack_half2x16, unquantize_unit};
use crate::error::SplatError;
use crate::store::SplatStore;
use crate::structures::{SplatRecord, TextureBuffer};
use log::debug;

/// Words per splat: two RGBA32UI texels.
const WORDS_PER_SPLAT: usize = 8;

/// Upper triangle of `Σ = Mᵀ·M` with `M = S·R`:
/// `[xx, xy, xz, yy, yz, zz]`.
pub fn covariance(record: &SplatRecord) -> [f32; 6] {
    let [w, x, y, z] = record.rotation.map(unquantize_unit);
    let [sx, sy, sz] = record.scale;

    // Rotation rows, each scaled by its axis.
    let m = [
        [
            (1.0 - 2.0 * (y * y + z * z)) * sx,
            2.0 * (x * y + w * z) * sx,
            2.0 * (x * z - w * y) * sx,
        ],
        [
            2.0 * (x * y - w * z) * sy,
            (1.0 - 2.0 * (x * x + z * z)) * sy,
            2.0 * (y * z + w * x) * sy,
        ],
        [
            2.0 * (x * z + w * y) * sz,
            2.0 * (y * z - w * x) * sz,
            (1.0 - 2.0 * (x * x + y * y)) * sz,
        ],
    ];

    let col = |a: usize, b: usize| m[0][a] * m[0][b] + m[1][a] * m[1][b] + m[2][a] * m[2][b];
    [col(0, 0), col(0, 1), col(0, 2), col(1, 1), col(1, 2), col(2, 2)]
}

/// Lays the live splats out as texture data for the renderer.
///
/// Words 0-2 hold the position floats, 4-6 the covariance as half pairs
/// (scaled by 4) and 7 the RGBA bytes. Word 3 stays zero.
pub fn pack_texture(store: &SplatStore, width: usize) -> Result<TextureBuffer, SplatError> {
    if width == 0 {
        return Err(SplatError::InvalidConfig(
            "texture width must be non-zero".to_string(),
        ));
    }
    let vertex_count = store.vertex_count();
    let height = (2 * vertex_count).div_ceil(width);
    let mut data = vec![0u32; width * height * 4];

    for (i, record) in store.records().enumerate() {
        let texel = &mut data[WORDS_PER_SPLAT * i..WORDS_PER_SPLAT * (i + 1)];
        texel[0] = record.position[0].to_bits();
        texel[1] = record.position[1].to_bits();
        texel[2] = record.position[2].to_bits();
        texel[7] = u32::from_le_bytes(record.color);

        let sigma = covariance(&record).map(|v| 4.0 * v);
        texel[4] = pack_half2x16(sigma[0], sigma[1]);
        texel[5] = pack_half2x16(sigma[2], sigma[3]);
        texel[6] = pack_half2x16(sigma[4], sigma[5]);
    }

    debug!("Packed texture {}x{} for {} splats", width, height, vertex_count);
    Ok(TextureBuffer {
        data,
        width,
        height,
    })
}
