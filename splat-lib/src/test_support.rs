//! Hand-built PLY fixtures for unit tests.

use crate::ply::PropertyKind;

pub(crate) struct PlyBuilder {
    properties: Vec<(String, String)>,
    rows: Vec<Vec<f64>>,
}

impl PlyBuilder {
    pub(crate) fn new(properties: &[(&str, &str)]) -> Self {
        Self {
            properties: properties
                .iter()
                .map(|(ty, name)| (ty.to_string(), name.to_string()))
                .collect(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn row(mut self, values: &[f64]) -> Self {
        assert_eq!(values.len(), self.properties.len());
        self.rows.push(values.to_vec());
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"ply\nformat binary_little_endian 1.0\n");
        out.extend_from_slice(format!("element vertex {}\n", self.rows.len()).as_bytes());
        for (ty, name) in &self.properties {
            out.extend_from_slice(format!("property {} {}\n", ty, name).as_bytes());
        }
        out.extend_from_slice(b"end_header\n");

        for row in &self.rows {
            for ((ty, _), &v) in self.properties.iter().zip(row) {
                match PropertyKind::from_name(ty) {
                    PropertyKind::Int8 => out.extend_from_slice(&(v as i8).to_le_bytes()),
                    PropertyKind::UInt8 => out.extend_from_slice(&(v as u8).to_le_bytes()),
                    PropertyKind::Int16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
                    PropertyKind::UInt16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
                    PropertyKind::Int32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
                    PropertyKind::UInt32 => out.extend_from_slice(&(v as u32).to_le_bytes()),
                    PropertyKind::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                    PropertyKind::Float64 => out.extend_from_slice(&v.to_le_bytes()),
                }
            }
        }
        out
    }
}
