//! Save-path derivation for downloaded torrents.
//!
//! Pure string computation — no filesystem access. The resulting path says
//! where a torrent file *would* be saved; actually writing it is up to the
//! caller.

/// Upper bound, in bytes, on a computed save path. Longer results are
/// silently truncated at a UTF-8 boundary — a documented limitation, not an
/// error.
pub const MAX_PATH_LEN: usize = 4096;

const TORRENT_SUFFIX: &str = ".torrent";

/// Base name used when neither the server nor the URL yields one
const FALLBACK_NAME: &str = "download";

/// Compute the save path for a torrent payload.
///
/// The base name is `server_filename` verbatim when present and non-empty
/// (typically from a `Content-Disposition` header); otherwise the last
/// non-empty `/`-delimited segment of `url`, percent-decoded. A `.torrent`
/// suffix is appended unless the base name already ends with it. The base
/// name is joined to `folder` with a single `/`, and the result is bounded
/// by [`MAX_PATH_LEN`].
pub fn torrent_save_path(server_filename: Option<&str>, url: &str, folder: &str) -> String {
    let base = match server_filename {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => basename_from_url(url),
    };

    let mut path = format!("{}/{}", folder.trim_end_matches('/'), base);
    if !base.ends_with(TORRENT_SUFFIX) {
        path.push_str(TORRENT_SUFFIX);
    }

    truncate_at_char_boundary(&mut path, MAX_PATH_LEN);
    path
}

/// Last non-empty path segment of `url`, percent-decoded. Falls back to raw
/// `/`-splitting for strings the `url` crate cannot parse, and to a fixed
/// name when the URL carries no usable segment at all.
fn basename_from_url(url: &str) -> String {
    let segment = if let Ok(parsed) = url::Url::parse(url)
        && let Some(segments) = parsed.path_segments()
    {
        segments
            .filter(|s| !s.is_empty())
            .next_back()
            .map(str::to_string)
    } else {
        url.split('/')
            .filter(|s| !s.is_empty())
            .next_back()
            .map(str::to_string)
    };

    match segment {
        Some(seg) => urlencoding::decode(&seg)
            .map(|decoded| decoded.into_owned())
            .unwrap_or(seg),
        None => FALLBACK_NAME.to_string(),
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
