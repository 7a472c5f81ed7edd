//! Payload layouts for every [`EventKind`].
//!
//! All integers are little-endian `int32`, all coordinates IEEE-754 `float32`.
//!
//! | Kind | Layout |
//! |---|---|
//! | `InitObject` | `vertexCount`, `vertexCount × (x, y, z)`, `faceCount`, `faceCount × (i0, i1, i2)` |
//! | `UpdateObject` | `vertexCount`, `vertexCount × (x, y, z)` |
//! | `InitSilhouetteArea` | `width`, `height` |
//! | `Update{Top,Bottom}Silhouette` | `pixelCount`, `height`, `width`, `pixelCount × u8` |
//!
//! Decoding checks structure only: declared counts must fit in the buffer.
//! Whether the numbers make sense together (face indices in range, pixel
//! count matching the declared size) is left to whoever applies the data.
//! Bytes past the declared structure are ignored.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::{EventKind, Frame, ProtocolError};

const VERTEX_SIZE: usize = 12;
const FACE_SIZE: usize = 12;

/// Vertex position in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Triangle as three 0-based vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face(pub [i32; 3]);

impl Face {
    pub fn new(i0: i32, i1: i32, i2: i32) -> Self {
        Self([i0, i1, i2])
    }

    pub fn indices(&self) -> [i32; 3] {
        self.0
    }
}

/// Full mesh: positions plus the topology that stays fixed until the next snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
}

impl MeshSnapshot {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }

    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let kind = EventKind::InitObject;
        let mut buf = BytesMut::with_capacity(
            8 + self.vertices.len() * VERTEX_SIZE + self.faces.len() * FACE_SIZE,
        );
        put_vertices(&mut buf, kind, &self.vertices)?;
        buf.put_i32_le(encode_count(kind, self.faces.len())?);
        for face in &self.faces {
            for index in face.0 {
                buf.put_i32_le(index);
            }
        }
        Ok(buf.freeze())
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(EventKind::InitObject, payload);
        let vertex_count = reader.read_count("vertex count", VERTEX_SIZE)?;
        let vertices = reader.read_vertices(vertex_count);
        let face_count = reader.read_count("face count", FACE_SIZE)?;
        let faces = (0..face_count)
            .map(|_| Face([reader.take_i32(), reader.take_i32(), reader.take_i32()]))
            .collect();
        Ok(Self { vertices, faces })
    }
}

/// New positions for every vertex of the current mesh, in the same order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshDelta {
    pub vertices: Vec<Vec3>,
}

impl MeshDelta {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::with_capacity(4 + self.vertices.len() * VERTEX_SIZE);
        put_vertices(&mut buf, EventKind::UpdateObject, &self.vertices)?;
        Ok(buf.freeze())
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(EventKind::UpdateObject, payload);
        let vertex_count = reader.read_count("vertex count", VERTEX_SIZE)?;
        Ok(Self {
            vertices: reader.read_vertices(vertex_count),
        })
    }
}

/// Canvas size shared by the top and bottom silhouettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilhouetteArea {
    pub width: i32,
    pub height: i32,
}

impl SilhouetteArea {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_i32_le(self.width);
        buf.put_i32_le(self.height);
        buf.freeze()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(EventKind::InitSilhouetteArea, payload);
        let width = reader.read_i32("width")?;
        let height = reader.read_i32("height")?;
        Ok(Self { width, height })
    }
}

/// 8-bit grayscale image in row-major order.
///
/// The wire header declares the height before the width; rows are `width`
/// samples long. The declared pixel count is always `pixels.len()`, and
/// nothing here checks it against `width * height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilhouetteBitmap {
    pub height: i32,
    pub width: i32,
    pub pixels: Vec<u8>,
}

impl SilhouetteBitmap {
    pub fn new(width: i32, height: i32, pixels: Vec<u8>) -> Self {
        Self {
            height,
            width,
            pixels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Sample at column `x`, row `y`.
    pub fn intensity(&self, x: usize, y: usize) -> Option<u8> {
        let width = usize::try_from(self.width).ok()?;
        if x >= width {
            return None;
        }
        self.pixels.get(y.checked_mul(width)?.checked_add(x)?).copied()
    }

    /// Expand to an opaque RGBA canvas of `width × height`. Samples that
    /// fall outside the canvas are dropped.
    pub fn to_rgba(&self) -> Vec<u8> {
        let width = usize::try_from(self.width).unwrap_or(0);
        let height = usize::try_from(self.height).unwrap_or(0);
        let mut rgba = vec![0u8; width.saturating_mul(height).saturating_mul(4)];
        if width == 0 {
            return rgba;
        }
        for (p, &value) in self.pixels.iter().enumerate() {
            let (x, y) = (p % width, p / width);
            let index = (y * width + x) * 4;
            if index + 4 > rgba.len() {
                break;
            }
            rgba[index..index + 4].copy_from_slice(&[value, value, value, u8::MAX]);
        }
        rgba
    }

    pub fn encode(&self, kind: EventKind) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::with_capacity(12 + self.pixels.len());
        buf.put_i32_le(encode_count(kind, self.pixels.len())?);
        buf.put_i32_le(self.height);
        buf.put_i32_le(self.width);
        buf.put_slice(&self.pixels);
        Ok(buf.freeze())
    }

    pub fn decode(kind: EventKind, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(kind, payload);
        // The pixel count comes first but its bytes come after the other
        // two header fields, so check the full header before the samples.
        let declared = reader.read_i32("pixel count")?;
        let height = reader.read_i32("height")?;
        let width = reader.read_i32("width")?;
        let pixel_count = reader.check_count("pixel count", declared, 1)?;
        let pixels = reader.take_bytes(pixel_count);
        Ok(Self {
            height,
            width,
            pixels,
        })
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InitObject(MeshSnapshot),
    UpdateObject(MeshDelta),
    InitSilhouetteArea(SilhouetteArea),
    UpdateTopSilhouette(SilhouetteBitmap),
    UpdateBottomSilhouette(SilhouetteBitmap),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::InitObject(_) => EventKind::InitObject,
            Event::UpdateObject(_) => EventKind::UpdateObject,
            Event::InitSilhouetteArea(_) => EventKind::InitSilhouetteArea,
            Event::UpdateTopSilhouette(_) => EventKind::UpdateTopSilhouette,
            Event::UpdateBottomSilhouette(_) => EventKind::UpdateBottomSilhouette,
        }
    }

    /// Untagged payload, as a producer posts it.
    pub fn encode_payload(&self) -> Result<Bytes, ProtocolError> {
        match self {
            Event::InitObject(mesh) => mesh.encode(),
            Event::UpdateObject(delta) => delta.encode(),
            Event::InitSilhouetteArea(area) => Ok(area.encode()),
            Event::UpdateTopSilhouette(bitmap) | Event::UpdateBottomSilhouette(bitmap) => {
                bitmap.encode(self.kind())
            }
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Ok(Frame::new(self.kind(), &self.encode_payload()?))
    }

    pub fn decode(kind: EventKind, payload: &[u8]) -> Result<Self, ProtocolError> {
        Ok(match kind {
            EventKind::InitObject => Event::InitObject(MeshSnapshot::decode(payload)?),
            EventKind::UpdateObject => Event::UpdateObject(MeshDelta::decode(payload)?),
            EventKind::InitSilhouetteArea => {
                Event::InitSilhouetteArea(SilhouetteArea::decode(payload)?)
            }
            EventKind::UpdateTopSilhouette => {
                Event::UpdateTopSilhouette(SilhouetteBitmap::decode(kind, payload)?)
            }
            EventKind::UpdateBottomSilhouette => {
                Event::UpdateBottomSilhouette(SilhouetteBitmap::decode(kind, payload)?)
            }
        })
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        Self::decode(frame.kind()?, frame.payload())
    }
}

fn encode_count(kind: EventKind, count: usize) -> Result<i32, ProtocolError> {
    i32::try_from(count).map_err(|_| ProtocolError::CountOverflow { kind, count })
}

fn put_vertices(buf: &mut BytesMut, kind: EventKind, vertices: &[Vec3]) -> Result<(), ProtocolError> {
    buf.put_i32_le(encode_count(kind, vertices.len())?);
    for v in vertices {
        buf.put_f32_le(v.x);
        buf.put_f32_le(v.y);
        buf.put_f32_le(v.z);
    }
    Ok(())
}

/// Bounds-checked cursor over a payload.
///
/// The `take_*` methods are only called after `read_count`/`check_count`
/// has confirmed enough bytes remain.
struct PayloadReader<'a> {
    kind: EventKind,
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    fn new(kind: EventKind, buf: &'a [u8]) -> Self {
        Self { kind, buf }
    }

    fn malformed(&self, reason: String) -> ProtocolError {
        ProtocolError::MalformedFrame {
            kind: self.kind,
            reason,
        }
    }

    fn read_i32(&mut self, field: &str) -> Result<i32, ProtocolError> {
        if self.buf.remaining() < 4 {
            return Err(self.malformed(format!(
                "{field} needs 4 bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(self.buf.get_i32_le())
    }

    /// Read an `int32` count of `elem_size`-byte elements and check they all fit.
    fn read_count(&mut self, field: &str, elem_size: usize) -> Result<usize, ProtocolError> {
        let declared = self.read_i32(field)?;
        self.check_count(field, declared, elem_size)
    }

    fn check_count(
        &self,
        field: &str,
        declared: i32,
        elem_size: usize,
    ) -> Result<usize, ProtocolError> {
        let count = usize::try_from(declared)
            .map_err(|_| self.malformed(format!("{field} is negative ({declared})")))?;
        let needed = count
            .checked_mul(elem_size)
            .ok_or_else(|| self.malformed(format!("{field} {count} overflows")))?;
        if self.buf.remaining() < needed {
            return Err(self.malformed(format!(
                "{field} {count} needs {needed} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(count)
    }

    fn take_i32(&mut self) -> i32 {
        self.buf.get_i32_le()
    }

    fn read_vertices(&mut self, count: usize) -> Vec<Vec3> {
        (0..count)
            .map(|_| {
                let x = self.buf.get_f32_le();
                let y = self.buf.get_f32_le();
                let z = self.buf.get_f32_le();
                Vec3 { x, y, z }
            })
            .collect()
    }

    fn take_bytes(&mut self, count: usize) -> Vec<u8> {
        let (head, rest) = self.buf.split_at(count);
        self.buf = rest;
        head.to_vec()
    }
}
