use base64::Engine as _;

/// Encode raw image bytes as a `data:` URL accepted by vision chat endpoints.
pub fn image_bytes_to_data_url(bytes: &[u8]) -> String {
    let mime = infer::get(bytes)
        .map(|t| t.mime_type())
        .unwrap_or("image/jpeg");
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime, b64)
}

#[test]
fn test_image_bytes_to_data_url() {
    // PNG signature followed by the start of an IHDR chunk
    let png = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];
    assert!(image_bytes_to_data_url(&png).starts_with("data:image/png;base64,iVBORw0KGgo"));

    // unknown content falls back to jpeg
    assert_eq!(image_bytes_to_data_url(b"abc"), "data:image/jpeg;base64,YWJj");
}
