//! GLB container fixtures.

/// Assemble a GLB container from a JSON chunk and an optional binary chunk,
/// padding each to 4-byte alignment as the format requires.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn build_glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json_payload = json.as_bytes().to_vec();
    while json_payload.len() % 4 != 0 {
        json_payload.push(b' ');
    }
    let mut bin_payload = bin.map(|b| b.to_vec()).unwrap_or_default();
    while bin_payload.len() % 4 != 0 {
        bin_payload.push(0);
    }

    let mut out = Vec::new();
    let total = 12 + 8 + json_payload.len() + if bin.is_some() { 8 + bin_payload.len() } else { 0 };
    out.extend_from_slice(&0x4654_6C67u32.to_le_bytes()); // "glTF"
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes()); // "JSON"
    out.extend_from_slice(&json_payload);
    if bin.is_some() {
        out.extend_from_slice(&(bin_payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes()); // "BIN\0"
        out.extend_from_slice(&bin_payload);
    }
    out
}

/// A well-formed single-mesh model with 1234 vertices.
#[allow(dead_code)]
pub fn valid_model_glb() -> Vec<u8> {
    build_glb(
        r#"{"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"accessors":[{"count":1234}]}"#,
        None,
    )
}

/// A well-formed model carrying an embedded PNG texture, so a save can
/// derive a real thumbnail.
#[allow(dead_code)]
pub fn model_glb_with_png() -> Vec<u8> {
    let png_signature = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
    build_glb(
        r#"{
            "meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
            "accessors":[{"count":64}],
            "images":[{"mimeType":"image/png","bufferView":0}],
            "bufferViews":[{"byteOffset":0,"byteLength":8}]
        }"#,
        Some(&png_signature),
    )
}

/// A buffer that fails structural validation at the first header check.
#[allow(dead_code)]
pub fn bad_magic_glb() -> Vec<u8> {
    let mut glb = valid_model_glb();
    glb[0] = b'X';
    glb
}
