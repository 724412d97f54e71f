//! YouTube URL helpers for building embeddable players.

const VIDEO_ID_LENGTH: usize = 11;

fn is_video_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Take an 11 character video id from the start of `rest`.
fn take_video_id(rest: &str) -> Option<&str> {
    let end = rest
        .char_indices()
        .find(|&(_, c)| !is_video_id_char(c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if end >= VIDEO_ID_LENGTH {
        rest.get(..VIDEO_ID_LENGTH)
    } else {
        None
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// Extract the video id from `watch?v=`, `youtu.be/`, `embed/` and `v/` URLs.
pub fn video_id(url: &str) -> Option<&str> {
    if !is_youtube_url(url) {
        return None;
    }
    for marker in ["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/", "youtube.com/v/"] {
        if let Some(idx) = url.find(marker) {
            if let Some(id) = take_video_id(&url[idx + marker.len()..]) {
                return Some(id);
            }
        }
    }
    // watch URLs with other query parameters before `v=`
    let query = url.split_once("youtube.com/watch?")?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("v="))
        .and_then(take_video_id)
}

/// Embed URL for a source URL, or an empty string when it is not a YouTube video.
pub fn embed_url(source_url: &str) -> String {
    video_id(source_url)
        .map(|id| format!("https://www.youtube.com/embed/{id}"))
        .unwrap_or_default()
}
