use crate::common::{
    clamp_u8, normalize_quat, quantize_unit, sigmoid, DEFAULT_ROTATION, DEFAULT_SCALE, SH_C0,
};
use crate::config::PipelineConfig;
use crate::error::SplatError;
use crate::ply::{Field, PlyHeader, RowReader, Schema};
use crate::structures::{SplatBuffer, SplatRecord};
use log::{debug, info};

const SCALE_FIELDS: [&str; 3] = ["scale_0", "scale_1", "scale_2"];
const ROT_FIELDS: [&str; 4] = ["rot_0", "rot_1", "rot_2", "rot_3"];
const SH_DC_FIELDS: [&str; 3] = ["f_dc_0", "f_dc_1", "f_dc_2"];
const RGB_FIELDS: [&str; 3] = ["red", "green", "blue"];

/// Fields resolved once per file. Optional groups are `None` when any
/// member is missing from the header.
struct Layout {
    position: [Field; 3],
    scale: Option<[Field; 3]>,
    rotation: Option<[Field; 4]>,
    opacity: Option<Field>,
    sh_dc: Option<[Field; 3]>,
    rgb: Option<[Field; 3]>,
}

fn optional<const N: usize>(
    schema: &Schema,
    names: [&str; N],
) -> Result<Option<[Field; N]>, SplatError> {
    if schema.contains_all(&names) {
        schema.fields(names).map(Some)
    } else {
        Ok(None)
    }
}

impl Layout {
    fn resolve(schema: &Schema) -> Result<Self, SplatError> {
        Ok(Layout {
            position: schema.fields(["x", "y", "z"])?,
            scale: optional(schema, SCALE_FIELDS)?,
            rotation: optional(schema, ROT_FIELDS)?,
            opacity: optional(schema, ["opacity"])?.map(|[f]| f),
            sh_dc: optional(schema, SH_DC_FIELDS)?,
            rgb: optional(schema, RGB_FIELDS)?,
        })
    }
}

/// Size times opacity: `exp(s0) * exp(s1) * exp(s2) * sigmoid(opacity)`.
/// Rows without scale fields score zero.
fn importance(reader: &RowReader, layout: &Layout, row: usize) -> f32 {
    let Some([s0, s1, s2]) = layout.scale else {
        return 0.0;
    };
    let size = reader.read(row, s0).exp() * reader.read(row, s1).exp() * reader.read(row, s2).exp();
    let opacity = layout
        .opacity
        .map_or(1.0, |op| sigmoid(reader.read(row, op)));
    (size * opacity) as f32
}

fn order_by_importance(reader: &RowReader, layout: &Layout) -> Vec<u32> {
    let scores: Vec<f32> = (0..reader.rows())
        .map(|row| importance(reader, layout, row))
        .collect();
    let mut order: Vec<u32> = (0..reader.rows() as u32).collect();
    order.sort_by(|&a, &b| {
        scores[b as usize]
            .total_cmp(&scores[a as usize])
            .then(a.cmp(&b))
    });
    order
}

/// Row indices sorted by descending importance, ties by ascending index.
pub fn importance_order(reader: &RowReader) -> Result<Vec<u32>, SplatError> {
    let layout = Layout::resolve(reader.schema())?;
    Ok(order_by_importance(reader, &layout))
}

fn encode_row(reader: &RowReader, layout: &Layout, row: usize) -> SplatRecord {
    let [x, y, z] = layout.position.map(|f| reader.read(row, f) as f32);

    let scale = match layout.scale {
        Some(fields) => fields.map(|f| reader.read(row, f).exp() as f32),
        None => DEFAULT_SCALE,
    };

    let rotation = layout
        .rotation
        .and_then(|fields| normalize_quat(fields.map(|f| reader.read(row, f))))
        .map_or(DEFAULT_ROTATION, |q| q.map(quantize_unit));

    let [r, g, b] = match (layout.sh_dc, layout.rgb) {
        (Some(dc), _) => dc.map(|f| clamp_u8((0.5 + SH_C0 * reader.read(row, f)) * 255.0)),
        (None, Some(rgb)) => rgb.map(|f| clamp_u8(reader.read(row, f))),
        (None, None) => [255, 255, 255],
    };
    let a = layout
        .opacity
        .map_or(255, |op| clamp_u8(sigmoid(reader.read(row, op)) * 255.0));

    SplatRecord {
        position: [x, y, z],
        scale,
        color: [r, g, b, a],
        rotation,
    }
}

/// Converts a PLY file into a splat buffer, most important splats first.
///
/// Nothing is produced when the header or body is malformed.
pub fn encode_ply(raw_data: &[u8], config: &PipelineConfig) -> Result<SplatBuffer, SplatError> {
    let header = PlyHeader::parse(raw_data, config.header_scan_limit)?;
    info!("Vertex count {}", header.vertex_count);
    debug!(
        "Bytes per row {}, properties {:?}",
        header.schema.stride(),
        header
            .schema
            .properties()
            .iter()
            .map(|p| (p.name.as_str(), p.offset))
            .collect::<Vec<_>>()
    );

    let reader = RowReader::new(
        &header.schema,
        &raw_data[header.body_offset..],
        header.vertex_count,
    )?;
    let layout = Layout::resolve(&header.schema)?;
    let order = order_by_importance(&reader, &layout);

    let records: Vec<SplatRecord> = order
        .iter()
        .map(|&row| encode_row(&reader, &layout, row as usize))
        .collect();
    Ok(SplatBuffer::from_records(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ROW_LENGTH;
    use crate::test_support::PlyBuilder;
    use approx::assert_abs_diff_eq;

    fn encode(builder: &PlyBuilder) -> SplatBuffer {
        encode_ply(&builder.build(), &PipelineConfig::default()).expect("encode_ply failed")
    }

    fn full_properties() -> Vec<(&'static str, &'static str)> {
        vec![
            ("float", "x"),
            ("float", "y"),
            ("float", "z"),
            ("float", "scale_0"),
            ("float", "scale_1"),
            ("float", "scale_2"),
            ("float", "rot_0"),
            ("float", "rot_1"),
            ("float", "rot_2"),
            ("float", "rot_3"),
            ("float", "opacity"),
            ("float", "f_dc_0"),
            ("float", "f_dc_1"),
            ("float", "f_dc_2"),
        ]
    }

    #[test]
    fn test_positions_only() {
        let buffer = encode(
            &PlyBuilder::new(&[("float", "x"), ("float", "y"), ("float", "z")])
                .row(&[0.0, 0.0, 0.0])
                .row(&[0.0, 0.0, -5.0]),
        );
        assert_eq!(buffer.byte_len(), 64);
        assert_eq!(buffer.len(), 2);

        let first = buffer.record(0).unwrap();
        let second = buffer.record(1).unwrap();
        assert_eq!(first.position, [0.0, 0.0, 0.0]);
        assert_eq!(second.position, [0.0, 0.0, -5.0]);
        for record in [first, second] {
            assert_eq!(record.scale, [0.01, 0.01, 0.01]);
            assert_eq!(record.rotation, [255, 0, 0, 0]);
            assert_eq!(record.color[3], 255);
        }
    }

    #[test]
    fn test_full_row_quantization() {
        let buffer = encode(&PlyBuilder::new(&full_properties()).row(&[
            1.0, -2.0, 3.5, // position
            0.0, -1.0, 0.5, // log scales
            2.0, 0.0, 0.0, 0.0, // rotation, normalized to (1, 0, 0, 0)
            0.0, // opacity logit
            0.0, 1.0, -1.0, // f_dc
        ]));
        let record = buffer.record(0).unwrap();
        assert_eq!(record.position, [1.0, -2.0, 3.5]);
        assert_abs_diff_eq!(record.scale[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(record.scale[1], (-1.0f32).exp(), epsilon = 1e-6);
        assert_abs_diff_eq!(record.scale[2], 0.5f32.exp(), epsilon = 1e-6);
        assert_eq!(record.rotation, [255, 128, 128, 128]);

        let expected_color = |dc: f64| ((0.5 + SH_C0 * dc) * 255.0) as f32;
        assert_abs_diff_eq!(record.color[0] as f32, expected_color(0.0), epsilon = 1.0);
        assert_abs_diff_eq!(record.color[1] as f32, expected_color(1.0), epsilon = 1.0);
        assert_abs_diff_eq!(record.color[2] as f32, expected_color(-1.0), epsilon = 1.0);
        assert_abs_diff_eq!(record.color[3] as f32, 127.5, epsilon = 1.0);
    }

    #[test]
    fn test_raw_rgb_and_clamping() {
        let buffer = encode(
            &PlyBuilder::new(&[
                ("float", "x"),
                ("float", "y"),
                ("float", "z"),
                ("uchar", "red"),
                ("uchar", "green"),
                ("uchar", "blue"),
                ("float", "opacity"),
            ])
            .row(&[0.0, 0.0, 0.0, 10.0, 20.0, 30.0, 50.0]),
        );
        let record = buffer.record(0).unwrap();
        assert_eq!(record.color, [10, 20, 30, 255]);
    }

    #[test]
    fn test_rotation_quantization() {
        let cases = [
            ([1.0, 1.0, 1.0, 1.0], [192, 192, 192, 192]),
            ([1.0, -1.0, 1.0, -1.0], [192, 64, 192, 64]),
            ([0.0, -3.0, 0.0, 0.0], [128, 0, 128, 128]),
            // +1 maps to 256 before clamping.
            ([0.0, 0.0, 4.0, 0.0], [128, 128, 255, 128]),
        ];
        for (rot, expected) in cases {
            let mut row = vec![0.0; 14];
            row[6..10].copy_from_slice(&rot);
            let buffer = encode(&PlyBuilder::new(&full_properties()).row(&row));
            assert_eq!(buffer.record(0).unwrap().rotation, expected, "rot {:?}", rot);
        }
    }

    #[test]
    fn test_sh_dc_saturates() {
        let buffer = encode(&PlyBuilder::new(&full_properties()).row(&[
            0.0, 0.0, 0.0, // position
            0.0, 0.0, 0.0, // log scales
            1.0, 0.0, 0.0, 0.0, // rotation
            100.0, // opacity logit
            10.0, -10.0, 0.0, // f_dc
        ]));
        let record = buffer.record(0).unwrap();
        assert_eq!(record.color[0], 255);
        assert_eq!(record.color[1], 0);
        assert_eq!(record.color[2], 128);
        assert_eq!(record.color[3], 255);
    }

    #[test]
    fn test_zero_quaternion_falls_back() {
        let mut row = vec![0.0; 14];
        row[6..10].copy_from_slice(&[0.0, 0.0, 0.0, 0.0]);
        let buffer = encode(&PlyBuilder::new(&full_properties()).row(&row));
        assert_eq!(buffer.record(0).unwrap().rotation, [255, 0, 0, 0]);
    }

    #[test]
    fn test_importance_descending() {
        // scores: exp(3 * s) * sigmoid(op)
        let rows = [(-2.0, 0.0), (1.0, 0.0), (0.0, 5.0), (-1.0, -3.0)];
        let mut builder = PlyBuilder::new(&full_properties());
        for (i, (s, op)) in rows.iter().enumerate() {
            builder = builder.row(&[
                i as f64, 0.0, 0.0, *s, *s, *s, 1.0, 0.0, 0.0, 0.0, *op, 0.0, 0.0, 0.0,
            ]);
        }
        let buffer = encode(&builder);
        let xs: Vec<f32> = buffer.records().map(|r| r.position[0]).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 0.0]);

        let scores: Vec<f32> = buffer
            .records()
            .map(|r| r.scale.iter().product::<f32>() * r.color[3] as f32)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_equal_scores_keep_row_order() {
        let mut builder = PlyBuilder::new(&full_properties());
        for i in 0..5 {
            builder = builder.row(&[
                i as f64, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ]);
        }
        let ply = builder.build();
        let header = PlyHeader::parse(&ply, 10 * 1024).unwrap();
        let reader = RowReader::new(&header.schema, &ply[header.body_offset..], 5).unwrap();
        assert_eq!(importance_order(&reader).unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_position_is_unknown_field() {
        let ply = PlyBuilder::new(&[("float", "x"), ("float", "y")])
            .row(&[0.0, 0.0])
            .build();
        let result = encode_ply(&ply, &PipelineConfig::default());
        assert!(matches!(result, Err(SplatError::UnknownField(name)) if name == "z"));
    }

    #[test]
    fn test_byte_length_matches_count() {
        let mut builder = PlyBuilder::new(&[("float", "x"), ("float", "y"), ("float", "z")]);
        for i in 0..17 {
            builder = builder.row(&[i as f64, 0.0, 0.0]);
        }
        let buffer = encode(&builder);
        assert_eq!(buffer.len(), 17);
        assert_eq!(buffer.len(), buffer.byte_len() / ROW_LENGTH);
    }
}
