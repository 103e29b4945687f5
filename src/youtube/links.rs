use super::YOUTUBE_BASE_URL;
use crate::error::{Result, TranscriptError};
use url::Url;

/// Characters that are not allowed in output file names
const UNSAFE_FILENAME_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Extract the video identifier from a watch URL (`...?v=<id>&...`) or a
/// short link (`youtu.be/<id>?...`)
pub fn extract_video_id(url: &str) -> Result<String> {
    let video_id = if let Some((_, rest)) = url.split_once("v=") {
        rest.split('&').next().unwrap_or_default()
    } else if let Some((_, rest)) = url.split_once("youtu.be/") {
        rest.split('?').next().unwrap_or_default()
    } else {
        return Err(TranscriptError::InvalidUrlFormat(url.to_string()));
    };

    if video_id.is_empty() {
        return Err(TranscriptError::InvalidUrlFormat(url.to_string()));
    }

    Ok(video_id.to_string())
}

/// Replace filesystem-unsafe characters with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Turn a watch link (relative or absolute) into
/// `https://www.youtube.com/watch?v=<id>`, dropping every other parameter
pub fn canonical_watch_url(href: &str) -> Option<String> {
    let base = Url::parse(YOUTUBE_BASE_URL).ok()?;
    let parsed = base.join(href).ok()?;

    let video_id = parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())?;

    Some(watch_url(&video_id))
}

pub fn watch_url(video_id: &str) -> String {
    format!("{}/watch?v={}", YOUTUBE_BASE_URL, video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120&list=PL1").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_query_form_takes_everything_up_to_ampersand() {
        // Opaque token: no length or alphabet check
        assert_eq!(extract_video_id("https://example.com/page?v=a.b-c_d").unwrap(), "a.b-c_d");
        assert_eq!(extract_video_id("https://m.youtube.com/watch?feature=share&v=xyz").unwrap(), "xyz");
    }

    #[test]
    fn test_short_link_id() {
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=tracking&t=3").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_invalid_urls() {
        for url in [
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://vimeo.com/12345",
            "not a url",
            "",
            "https://www.youtube.com/watch?v=",
            "https://youtu.be/?t=3",
        ] {
            assert!(
                matches!(extract_video_id(url), Err(TranscriptError::InvalidUrlFormat(ref u)) if u == url),
                "expected InvalidUrlFormat for {:?}",
                url
            );
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("Aula 1 - Introdução (parte 2)"), "Aula 1 - Introdução (parte 2)");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in [r#"What? Why: "Because" <now> | later"#, "plain", "a/b\\c"] {
            let once = sanitize_filename(name);
            assert_eq!(sanitize_filename(&once), once);
            assert_eq!(once.chars().count(), name.chars().count());
        }
    }

    #[test]
    fn test_canonical_watch_url() {
        assert_eq!(
            canonical_watch_url("/watch?v=abc123&list=PLx&index=2").as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
        assert_eq!(
            canonical_watch_url("https://www.youtube.com/watch?v=abc123&pp=tracking").as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
        assert_eq!(canonical_watch_url("/watch?list=PLx"), None);
        assert_eq!(canonical_watch_url("/watch?v="), None);
    }
}
