use crate::error::SplatError;
use foldhash::HashMap;

const HEADER_END: &[u8] = b"end_header\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl PropertyKind {
    /// Unrecognized type names fall back to a signed byte.
    pub fn from_name(name: &str) -> Self {
        match name {
            "char" | "int8" => PropertyKind::Int8,
            "uchar" | "uint8" => PropertyKind::UInt8,
            "short" | "int16" => PropertyKind::Int16,
            "ushort" | "uint16" => PropertyKind::UInt16,
            "int" | "int32" => PropertyKind::Int32,
            "uint" | "uint32" => PropertyKind::UInt32,
            "float" | "float32" => PropertyKind::Float32,
            "double" | "float64" => PropertyKind::Float64,
            _ => PropertyKind::Int8,
        }
    }

    pub const fn size(self) -> usize {
        match self {
            PropertyKind::Int8 | PropertyKind::UInt8 => 1,
            PropertyKind::Int16 | PropertyKind::UInt16 => 2,
            PropertyKind::Int32 | PropertyKind::UInt32 | PropertyKind::Float32 => 4,
            PropertyKind::Float64 => 8,
        }
    }

    /// Decodes a little-endian value. `bytes` must hold at least `size()` bytes.
    #[inline]
    fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            PropertyKind::Int8 => bytes[0] as i8 as f64,
            PropertyKind::UInt8 => bytes[0] as f64,
            PropertyKind::Int16 => i16::from_le_bytes(le(bytes)) as f64,
            PropertyKind::UInt16 => u16::from_le_bytes(le(bytes)) as f64,
            PropertyKind::Int32 => i32::from_le_bytes(le(bytes)) as f64,
            PropertyKind::UInt32 => u32::from_le_bytes(le(bytes)) as f64,
            PropertyKind::Float32 => f32::from_le_bytes(le(bytes)) as f64,
            PropertyKind::Float64 => f64::from_le_bytes(le(bytes)),
        }
    }
}

#[inline(always)]
fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    pub offset: usize,
}

/// Resolved location of one property inside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    offset: usize,
    kind: PropertyKind,
}

/// Row layout of the vertex element, in header order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: Vec<Property>,
    by_name: HashMap<String, usize>,
    stride: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, kind: PropertyKind) {
        let property = Property {
            name: name.to_string(),
            kind,
            offset: self.stride,
        };
        self.stride += kind.size();
        self.by_name.insert(property.name.clone(), self.properties.len());
        self.properties.push(property);
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn contains_all(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.contains(name))
    }

    pub fn field(&self, name: &str) -> Result<Field, SplatError> {
        let idx = self
            .by_name
            .get(name)
            .ok_or_else(|| SplatError::UnknownField(name.to_string()))?;
        let property = &self.properties[*idx];
        Ok(Field {
            offset: property.offset,
            kind: property.kind,
        })
    }

    /// Resolves several fields at once, failing on the first missing name.
    pub fn fields<const N: usize>(&self, names: [&str; N]) -> Result<[Field; N], SplatError> {
        let mut out = [Field {
            offset: 0,
            kind: PropertyKind::Int8,
        }; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.field(name)?;
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct PlyHeader {
    pub vertex_count: usize,
    pub schema: Schema,
    /// First byte of the binary body.
    pub body_offset: usize,
}

#[inline]
fn next_line<'b>(buffer: &'b [u8], offset: &mut usize) -> Option<&'b [u8]> {
    if *offset >= buffer.len() {
        return None;
    }
    let start = *offset;

    match memchr::memchr(b'\n', &buffer[*offset..]) {
        Some(pos) => {
            *offset = start + pos + 1;
            Some(&buffer[start..start + pos])
        }
        None => {
            *offset = buffer.len();
            Some(&buffer[start..])
        }
    }
}

impl PlyHeader {
    /// Parses the ASCII header. The terminator must lie within the first
    /// `scan_limit` bytes.
    pub fn parse(raw_data: &[u8], scan_limit: usize) -> Result<Self, SplatError> {
        let window = &raw_data[..raw_data.len().min(scan_limit)];
        let header_end =
            memchr::memmem::find(window, HEADER_END).ok_or(SplatError::HeaderNotFound)?;
        let header = &raw_data[..header_end];

        let mut vertex_count = None;
        let mut in_vertex = false;
        let mut schema = Schema::new();
        let mut offset = 0;
        while let Some(raw_line) = next_line(header, &mut offset) {
            let line = std::str::from_utf8(raw_line)
                .map_err(|e| SplatError::InvalidHeader(format!("UTF-8 error: {}", e)))?
                .trim_end_matches('\r');
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("format") => {
                    let format = parts.next().unwrap_or_default();
                    if format != "binary_little_endian" {
                        return Err(SplatError::InvalidHeader(format!(
                            "Unsupported .ply format '{}' (only binary_little_endian is supported)",
                            format
                        )));
                    }
                }
                Some("element") => {
                    in_vertex = parts.next() == Some("vertex");
                    if in_vertex {
                        let count = parts.next().ok_or(SplatError::MissingVertexCount)?;
                        let count = count.parse::<usize>().map_err(|e| {
                            SplatError::InvalidHeader(format!("Vertex count '{}': {}", count, e))
                        })?;
                        vertex_count = Some(count);
                    }
                }
                Some("property") if in_vertex => {
                    let (Some(ty), Some(name)) = (parts.next(), parts.next()) else {
                        return Err(SplatError::InvalidHeader(format!(
                            "Malformed property line: {:?}",
                            line
                        )));
                    };
                    schema.push(name, PropertyKind::from_name(ty));
                }
                _ => {}
            }
        }

        let vertex_count = vertex_count.ok_or(SplatError::MissingVertexCount)?;
        Ok(PlyHeader {
            vertex_count,
            schema,
            body_offset: header_end + HEADER_END.len(),
        })
    }
}

/// Typed access to the binary body: row `r`, field `f` lives at
/// `stride * r + f.offset`.
#[derive(Debug, Clone, Copy)]
pub struct RowReader<'a> {
    schema: &'a Schema,
    body: &'a [u8],
    rows: usize,
}

impl<'a> RowReader<'a> {
    pub fn new(schema: &'a Schema, body: &'a [u8], rows: usize) -> Result<Self, SplatError> {
        let needed = schema
            .stride()
            .checked_mul(rows)
            .ok_or_else(|| SplatError::InvalidHeader("Overflow in byte calculation".to_string()))?;
        if body.len() < needed {
            return Err(SplatError::TruncatedBody {
                needed,
                available: body.len(),
            });
        }
        Ok(Self { schema, body, rows })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Reads a resolved field. `row` must be below `rows()`.
    #[inline]
    pub fn read(&self, row: usize, field: Field) -> f64 {
        debug_assert!(row < self.rows);
        let at = row * self.schema.stride() + field.offset;
        field.kind.decode(&self.body[at..at + field.kind.size()])
    }

    pub fn get(&self, row: usize, name: &str) -> Result<f64, SplatError> {
        Ok(self.read(row, self.schema.field(name)?))
    }
}
