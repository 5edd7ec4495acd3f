//! Staged file naming for direct links.

use percent_encoding::percent_decode_str;

/// Characters that may not appear in a staged file name.
const UNSAFE_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Replaces path separators and shell-hostile characters with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Extracts a file name from a `Content-Disposition` header value.
///
/// The RFC 5987 `filename*=charset''percent-encoded` form wins over a plain
/// `filename=`; quotes are stripped from either.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();

    if let Some(start) = lower.find("filename*=") {
        let value = param_value(&header[start + "filename*=".len()..]);
        let encoded = match value.find("''") {
            Some(pos) => &value[pos + 2..],
            None => value,
        };
        if let Ok(decoded) = percent_decode_str(encoded).decode_utf8() {
            let decoded = decoded.trim();
            if !decoded.is_empty() {
                return Some(decoded.to_string());
            }
        }
    }

    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find("filename=") {
        let start = search_from + found;
        search_from = start + "filename=".len();
        // Skip the `filename=` inside `filename*=`.
        if start > 0 && lower.as_bytes()[start - 1] == b'*' {
            continue;
        }
        let value = param_value(&header[search_from..]).trim_matches('\'').trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    None
}

fn param_value(rest: &str) -> &str {
    let rest = rest.trim_start();
    if let Some(quoted) = rest.strip_prefix('"') {
        return quoted.split('"').next().unwrap_or(quoted).trim();
    }
    rest.split(';').next().unwrap_or(rest).trim()
}

/// Last path segment of `url` when it looks like a file name.
pub(crate) fn filename_from_url(url: &reqwest::Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    if decoded.contains('.') && !decoded.trim_matches('.').is_empty() {
        Some(decoded.into_owned())
    } else {
        None
    }
}

/// Extensions picked first when a MIME type maps to several.
const PREFERRED_EXTENSIONS: &[&str] = &[
    "bin", "txt", "jpg", "mp3", "mp4", "mpg", "mov", "wav", "ogg", "html", "xml", "gz", "tar",
    "doc", "xls", "ppt",
];

/// File extension (with leading dot) for a MIME type, `.bin` if unknown.
pub fn extension_for_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let Some(candidates) = mime_guess::get_mime_extensions_str(&essence) else {
        return ".bin".to_string();
    };
    let subtype = essence.rsplit('/').next().unwrap_or_default();
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);

    let picked = PREFERRED_EXTENSIONS
        .iter()
        .find(|ext| candidates.contains(ext))
        .copied()
        .or_else(|| candidates.iter().find(|ext| **ext == subtype).copied())
        .or_else(|| candidates.first().copied());

    match picked {
        Some(ext) => format!(".{ext}"),
        None => ".bin".to_string(),
    }
}

/// Picks the staged name for a direct link.
///
/// Preference: `Content-Disposition`, then the request URL's last segment
/// if it has an extension, then `download_<8 hex><ext>`.
pub(crate) fn resolve_file_name(
    disposition: Option<&str>,
    url: &reqwest::Url,
    content_type: Option<&str>,
) -> String {
    let picked = disposition
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(url));

    match picked.map(|name| sanitize_file_name(&name)) {
        Some(name) if !name.trim_matches('.').is_empty() => name,
        _ => generated_name(content_type),
    }
}

fn generated_name(content_type: Option<&str>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let ext = extension_for_content_type(content_type.unwrap_or("application/octet-stream"));
    format!("download_{}{ext}", &id[..8])
}
