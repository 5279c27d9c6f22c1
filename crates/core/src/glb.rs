//! GLB container analysis.
//!
//! A GLB file is a 12-byte header followed by length-prefixed chunks. The
//! first chunk carries the JSON scene description; an optional second chunk
//! carries the binary geometry/texture payload. `analyze` extracts the
//! structural counts the rigging pipeline and tier checks need, and is
//! total: malformed input yields an analysis with `parse_error` set and all
//! counts zeroed, never a panic or an `Err`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GLB magic: the ASCII bytes "glTF" read as a little-endian u32.
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// Chunk type of the structured JSON chunk ("JSON").
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;

/// Chunk type of the binary payload chunk ("BIN\0").
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

/// Header size: magic + version + declared total length, u32 LE each.
pub const GLB_HEADER_LEN: usize = 12;

/// Smallest parseable container: header plus one chunk header.
pub const GLB_MIN_LEN: usize = GLB_HEADER_LEN + 8;

/// The mesh attribute whose accessor count contributes to the vertex total.
const POSITION_ATTRIBUTE: &str = "POSITION";

/// Structural summary of a GLB container.
///
/// Produced once per uploaded file and never mutated afterwards.
/// `actual_byte_length` is always the real buffer length; the header's
/// declared length is reported separately because the two may legitimately
/// differ, and storage/billing decisions must trust the actual size.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlbAnalysis {
    /// Total vertex count across all primitives with a position attribute.
    pub vertex_count: u64,
    /// Number of primitives across all meshes.
    pub primitive_count: u32,
    /// Number of meshes in the scene description.
    pub mesh_count: u32,
    /// Container version from the header.
    pub container_version: u32,
    /// Total length the header claims the file has.
    pub declared_byte_length: u64,
    /// Length the buffer really has.
    pub actual_byte_length: u64,
    /// Set when the container failed structural validation; counts are
    /// zeroed in that case.
    pub parse_error: Option<String>,
}

impl GlbAnalysis {
    /// Whether the container parsed cleanly.
    pub fn is_valid(&self) -> bool {
        self.parse_error.is_none()
    }
}

/// Minimal projection of the JSON chunk: only the fields the analysis and
/// thumbnail extraction walk. Everything else in the scene description is
/// ignored on purpose.
#[derive(Debug, Default, Deserialize)]
struct SceneDoc {
    #[serde(default)]
    meshes: Vec<MeshDoc>,
    #[serde(default)]
    accessors: Vec<AccessorDoc>,
    #[serde(default)]
    images: Vec<ImageDoc>,
    #[serde(default, rename = "bufferViews")]
    buffer_views: Vec<BufferViewDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct MeshDoc {
    #[serde(default)]
    primitives: Vec<PrimitiveDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct PrimitiveDoc {
    /// Attribute name to accessor index.
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessorDoc {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ImageDoc {
    #[serde(rename = "bufferView")]
    buffer_view: Option<usize>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BufferViewDoc {
    #[serde(default, rename = "byteOffset")]
    byte_offset: usize,
    #[serde(default, rename = "byteLength")]
    byte_length: usize,
}

fn read_u32_le(b: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([b[offset], b[offset + 1], b[offset + 2], b[offset + 3]])
}

/// Locate the JSON chunk payload, with trailing 0x20 padding stripped.
/// Chunk payloads are 4-byte aligned and the declared chunk length covers
/// the padding, so the raw slice must be trimmed before JSON decoding.
fn structured_chunk(b: &[u8]) -> Result<&[u8], String> {
    if b.len() < GLB_MIN_LEN {
        return Err(format!(
            "container too small: {} bytes (need at least {GLB_MIN_LEN})",
            b.len()
        ));
    }
    let magic = read_u32_le(b, 0);
    if magic != GLB_MAGIC {
        return Err(format!("bad magic: {magic:#010x}"));
    }
    let chunk_len = read_u32_le(b, GLB_HEADER_LEN) as usize;
    let chunk_type = read_u32_le(b, GLB_HEADER_LEN + 4);
    if chunk_type != CHUNK_TYPE_JSON {
        return Err(format!("first chunk is not JSON: {chunk_type:#010x}"));
    }
    let payload_start = GLB_MIN_LEN;
    let payload_end = payload_start
        .checked_add(chunk_len)
        .filter(|end| *end <= b.len())
        .ok_or_else(|| {
            format!(
                "JSON chunk length {chunk_len} overruns buffer of {} bytes",
                b.len()
            )
        })?;
    let mut payload = &b[payload_start..payload_end];
    while let [rest @ .., b' '] = payload {
        payload = rest;
    }
    Ok(payload)
}

/// Locate the binary chunk payload, if the container carries one.
fn binary_chunk(b: &[u8]) -> Option<&[u8]> {
    if b.len() < GLB_MIN_LEN {
        return None;
    }
    let json_len = read_u32_le(b, GLB_HEADER_LEN) as usize;
    let bin_header = GLB_MIN_LEN.checked_add(json_len)?;
    if b.len() < bin_header.checked_add(8)? {
        return None;
    }
    let bin_len = read_u32_le(b, bin_header) as usize;
    if read_u32_le(b, bin_header + 4) != CHUNK_TYPE_BIN {
        return None;
    }
    let bin_start = bin_header + 8;
    let bin_end = bin_start.checked_add(bin_len)?;
    if b.len() < bin_end {
        return None;
    }
    Some(&b[bin_start..bin_end])
}

/// Analyze a GLB buffer.
///
/// Total over arbitrary input: structural failures are reported through
/// `parse_error` with all counts zeroed, so callers can branch on
/// `is_valid()` instead of handling panics or errors.
pub fn analyze(buffer: &[u8]) -> GlbAnalysis {
    let mut analysis = GlbAnalysis {
        actual_byte_length: buffer.len() as u64,
        ..GlbAnalysis::default()
    };

    let payload = match structured_chunk(buffer) {
        Ok(payload) => payload,
        Err(reason) => {
            analysis.parse_error = Some(reason);
            return analysis;
        }
    };
    // The header validated, so version and declared length are meaningful
    // even if the JSON below turns out to be garbage.
    analysis.container_version = read_u32_le(buffer, 4);
    analysis.declared_byte_length = read_u32_le(buffer, 8) as u64;

    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => {
            analysis.parse_error = Some(format!("JSON chunk is not UTF-8: {e}"));
            return analysis;
        }
    };
    let doc: SceneDoc = match serde_json::from_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            analysis.parse_error = Some(format!("JSON chunk did not decode: {e}"));
            return analysis;
        }
    };

    analysis.mesh_count = doc.meshes.len() as u32;
    for mesh in &doc.meshes {
        analysis.primitive_count += mesh.primitives.len() as u32;
        for primitive in &mesh.primitives {
            if let Some(&accessor) = primitive.attributes.get(POSITION_ATTRIBUTE)
                && let Some(accessor) = doc.accessors.get(accessor)
            {
                analysis.vertex_count += accessor.count;
            }
        }
    }
    analysis
}

/// Pull the first embedded texture image out of a GLB buffer.
///
/// Used for thumbnail derivation after rigging. Returns the image bytes and
/// their MIME type, or `None` when the container has no usable embedded
/// image (no images, no binary chunk, out-of-range buffer view, or an
/// image format browsers cannot display directly).
pub fn extract_embedded_image(buffer: &[u8]) -> Option<(Bytes, &'static str)> {
    let payload = structured_chunk(buffer).ok()?;
    let text = std::str::from_utf8(payload).ok()?;
    let doc: SceneDoc = serde_json::from_str(text).ok()?;
    let bin = binary_chunk(buffer)?;

    for image in &doc.images {
        let mime = match image.mime_type.as_deref() {
            Some("image/png") => "image/png",
            Some("image/jpeg") => "image/jpeg",
            _ => continue,
        };
        let Some(view) = image.buffer_view.and_then(|i| doc.buffer_views.get(i)) else {
            continue;
        };
        let end = view.byte_offset.checked_add(view.byte_length)?;
        if end <= bin.len() && view.byte_length > 0 {
            return Some((Bytes::copy_from_slice(&bin[view.byte_offset..end]), mime));
        }
    }
    None
}
