use mime::Mime;

/// Characters that separate path segments in source references.
pub const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

/// MIME type used whenever nothing better is known.
pub fn fallback_mime() -> Mime {
    mime::IMAGE_JPEG
}

/// Maps a file extension to its image MIME type. Unknown extensions map to
/// `image/jpeg`.
pub fn mime_from_extension(extension: &str) -> Mime {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        _ => fallback_mime(),
    }
}

/// Extension of the last path segment, without the dot.
pub fn extension_of(name: &str) -> Option<&str> {
    let segment = name.rsplit(PATH_SEPARATORS).next().unwrap_or(name);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Extension used for generated file names.
pub fn extension_for(mime: &Mime) -> &'static str {
    if *mime == mime::IMAGE_PNG {
        "png"
    } else if *mime == mime::IMAGE_GIF {
        "gif"
    } else {
        "jpg"
    }
}
