use half::f16;

// 6*4 + 4 + 4 = 8*4
// XYZ - Position (f32)
// XYZ - Scale (f32)
// RGBA - colors (u8)
// IJKL - quaternion/rot (u8)
pub const ROW_LENGTH: usize = 3 * 4 + 3 * 4 + 4 + 4;

pub const HEADER_SCAN_LIMIT: usize = 10 * 1024;
pub const DEFAULT_TEXTURE_WIDTH: usize = 1024 * 2;
pub const DEFAULT_SIMILARITY_EPSILON: f32 = 0.01;
pub const DEPTH_SCALE: f32 = 4096.0;
pub const DEPTH_BUCKETS: usize = 256 * 256;

pub(crate) const SH_C0: f64 = 0.28209479177387814;
pub(crate) const DEFAULT_SCALE: [f32; 3] = [0.01, 0.01, 0.01];
pub(crate) const DEFAULT_ROTATION: [u8; 4] = [255, 0, 0, 0];

#[inline]
pub(crate) fn clamp_u8(x: f64) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Normalizes a quaternion, returning `None` when it has no length.
#[inline]
pub(crate) fn normalize_quat(q: [f64; 4]) -> Option<[f64; 4]> {
    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some([q[0] / norm, q[1] / norm, q[2] / norm, q[3] / norm])
}

/// Maps a component in [-1, 1] onto a byte, 0 -> 128.
#[inline]
pub(crate) fn quantize_unit(x: f64) -> u8 {
    clamp_u8(x * 128.0 + 128.0)
}

#[inline]
pub(crate) fn unquantize_unit(x: u8) -> f32 {
    (x as f32 - 128.0) / 128.0
}

#[inline]
pub fn float_to_half(x: f32) -> u16 {
    f16::from_f32(x).to_bits()
}

#[inline]
pub fn half_to_float(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Packs two floats as halves into one word, `lo` in the low 16 bits.
#[inline]
pub fn pack_half2x16(lo: f32, hi: f32) -> u32 {
    float_to_half(lo) as u32 | ((float_to_half(hi) as u32) << 16)
}

#[inline]
pub fn unpack_half2x16(word: u32) -> (f32, f32) {
    (
        half_to_float((word & 0xFFFF) as u16),
        half_to_float((word >> 16) as u16),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clamp_u8_saturates() {
        assert_eq!(clamp_u8(-3.0), 0);
        assert_eq!(clamp_u8(256.0), 255);
        assert_eq!(clamp_u8(127.4), 127);
        assert_eq!(clamp_u8(f64::NAN), 0);
    }

    #[test]
    fn test_quantize_unit_range() {
        assert_eq!(quantize_unit(1.0), 255);
        assert_eq!(quantize_unit(0.0), 128);
        assert_eq!(quantize_unit(-1.0), 0);
        assert_abs_diff_eq!(unquantize_unit(quantize_unit(0.5)), 0.5, epsilon = 1.0 / 128.0);
    }

    #[test]
    fn test_normalize_zero_quat() {
        assert!(normalize_quat([0.0; 4]).is_none());
        let q = normalize_quat([2.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(q, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pack_half2x16_layout() {
        let word = pack_half2x16(1.0, -2.0);
        assert_eq!(word & 0xFFFF, 0x3C00);
        assert_eq!(word >> 16, 0xC000);
        let (lo, hi) = unpack_half2x16(word);
        assert_eq!(lo, 1.0);
        assert_eq!(hi, -2.0);
    }
}
