use super::links::watch_url;
use crate::error::{Result, TranscriptError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info};
use url::Url;

/// One timed caption segment
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptChunk {
    /// Seconds from the start of the video
    pub start: f64,
    /// Seconds the segment stays on screen
    pub duration: f64,
    pub text: String,
}

impl TranscriptChunk {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration,
            text: text.into(),
        }
    }
}

/// An available caption track for a video
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    pub video_id: String,
    pub language_code: String,
    pub name: String,
    /// Automatic speech recognition track
    pub is_generated: bool,
    /// Where the timed text is served from
    pub base_url: String,
}

/// Capability interface over the caption service
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// List the caption tracks of a video
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>>;

    /// Retrieve the chunks of one track, in order
    async fn fetch_chunks(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptChunk>>;
}

/// Fetch the transcript of `video_id` in exactly `language`, joined with
/// newlines in chunk order
pub async fn fetch_transcript(
    source: &dyn TranscriptSource,
    video_id: &str,
    language: &str,
) -> Result<String> {
    let tracks = source.list_tracks(video_id).await?;
    debug!("Video {} has {} caption tracks", video_id, tracks.len());

    let track = select_track(&tracks, language).ok_or_else(|| {
        TranscriptError::TranscriptUnavailable {
            video_id: video_id.to_string(),
            language: language.to_string(),
            available: available_languages(&tracks),
        }
    })?;

    let chunks = source.fetch_chunks(track).await?;
    info!(
        "📝 Retrieved {} caption chunks for {} ({}{})",
        chunks.len(),
        video_id,
        track.language_code,
        if track.is_generated { ", auto-generated" } else { "" }
    );

    Ok(join_chunks(&chunks))
}

/// Pick the track for `language`; manual captions win over generated ones
pub fn select_track<'a>(tracks: &'a [TranscriptTrack], language: &str) -> Option<&'a TranscriptTrack> {
    let mut matching = tracks.iter().filter(|t| t.language_code == language);
    let first = matching.next()?;
    if !first.is_generated {
        return Some(first);
    }
    Some(matching.find(|t| !t.is_generated).unwrap_or(first))
}

pub fn join_chunks(chunks: &[TranscriptChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn available_languages(tracks: &[TranscriptTrack]) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for track in tracks {
        if !languages.contains(&track.language_code) {
            languages.push(track.language_code.clone());
        }
    }
    languages
}

/// `TranscriptSource` backed by YouTube's watch page and timed text service
#[derive(Clone)]
pub struct YouTubeTranscriptSource {
    client: Client,
}

impl YouTubeTranscriptSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_text(&self, url: &str, video_id: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscriptError::lookup_failed(video_id, e))?;

        if !response.status().is_success() {
            return Err(TranscriptError::lookup_failed(
                video_id,
                format!("HTTP {} from {}", response.status(), url),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::lookup_failed(video_id, e))
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscriptSource {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
        let url = watch_url(video_id);
        let url = url.as_str();
        let html = self.get_text(url, video_id, None).await?;
        let html = accept_consent(html, video_id, |cookie| async move {
            self.get_text(url, video_id, Some(&cookie)).await
        })
        .await?;
        parse_caption_tracks(&html, video_id)
    }

    async fn fetch_chunks(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptChunk>> {
        let url = json3_url(&track.base_url)
            .ok_or_else(|| TranscriptError::lookup_failed(&track.video_id, "invalid caption track URL"))?;
        let body = self.get_text(&url, &track.video_id, None).await?;
        parse_json3(&body, &track.video_id)
    }
}

static CONSENT_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="v"\s+value="([^"]*)""#).expect("valid regex"));

const CONSENT_FORM_ACTION: &str = "action=\"https://consent.youtube.com/s\"";

/// Whether YouTube answered with its cookie consent form instead of the page
pub fn is_consent_page(html: &str) -> bool {
    html.contains(CONSENT_FORM_ACTION)
}

/// `CONSENT` cookie accepting the form on a consent page
pub fn consent_cookie(html: &str) -> Option<String> {
    let value = CONSENT_VALUE.captures(html)?.get(1)?.as_str();
    Some(format!("CONSENT=YES+{}", value))
}

/// Pass a watch page through, or accept the consent form once and return
/// what `refetch` gets with the consent cookie set
pub async fn accept_consent<F, Fut>(html: String, video_id: &str, refetch: F) -> Result<String>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if !is_consent_page(&html) {
        return Ok(html);
    }

    let cookie = consent_cookie(&html)
        .ok_or_else(|| TranscriptError::lookup_failed(video_id, "consent page without a consent value"))?;
    debug!("Consent page for {}, retrying with consent cookie", video_id);

    let html = refetch(cookie).await?;
    if is_consent_page(&html) {
        return Err(TranscriptError::lookup_failed(
            video_id,
            "consent page returned again after accepting cookies",
        ));
    }
    Ok(html)
}

static PLAYER_RESPONSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s|</script>)")
        .expect("valid regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: CaptionRenderer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn display(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

/// Read the caption track list out of a watch page
pub fn parse_caption_tracks(html: &str, video_id: &str) -> Result<Vec<TranscriptTrack>> {
    let json = PLAYER_RESPONSE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| TranscriptError::lookup_failed(video_id, "no player response in watch page"))?
        .as_str();

    let player: PlayerResponse = serde_json::from_str(json)
        .map_err(|e| TranscriptError::lookup_failed(video_id, format!("malformed player response: {}", e)))?;

    if let Some(status) = &player.playability_status {
        if status.status != "OK" {
            return Err(TranscriptError::lookup_failed(
                video_id,
                format!(
                    "video not playable ({}): {}",
                    status.status,
                    status.reason.as_deref().unwrap_or("no reason given")
                ),
            ));
        }
    }

    let tracks = player
        .captions
        .map(|c| c.renderer.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(|track| TranscriptTrack {
            video_id: video_id.to_string(),
            name: track
                .name
                .as_ref()
                .map(TrackName::display)
                .unwrap_or_else(|| track.language_code.clone()),
            is_generated: track.kind.as_deref() == Some("asr"),
            language_code: track.language_code,
            base_url: track.base_url,
        })
        .collect();

    Ok(tracks)
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    segs: Option<Vec<TimedTextSegment>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

/// Convert a json3 timed text document into chunks
pub fn parse_json3(body: &str, video_id: &str) -> Result<Vec<TranscriptChunk>> {
    let timed_text: TimedText = serde_json::from_str(body)
        .map_err(|e| TranscriptError::lookup_failed(video_id, format!("malformed timed text: {}", e)))?;

    let chunks = timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text: String = segs.iter().map(|s| s.utf8.as_str()).collect();
            if text.trim().is_empty() {
                return None;
            }
            Some(TranscriptChunk::new(
                event.start_ms as f64 / 1000.0,
                event.duration_ms as f64 / 1000.0,
                text,
            ))
        })
        .collect();

    Ok(chunks)
}

fn json3_url(base_url: &str) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory caption service: video id -> (language, generated, texts)
    struct FakeSource {
        videos: HashMap<String, Vec<(&'static str, bool, Vec<&'static str>)>>,
    }

    impl FakeSource {
        fn with_video(video_id: &str, tracks: Vec<(&'static str, bool, Vec<&'static str>)>) -> Self {
            let mut videos = HashMap::new();
            videos.insert(video_id.to_string(), tracks);
            Self { videos }
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
            let tracks = self
                .videos
                .get(video_id)
                .ok_or_else(|| TranscriptError::lookup_failed(video_id, "video unavailable"))?;

            Ok(tracks
                .iter()
                .enumerate()
                .map(|(i, (lang, generated, _))| TranscriptTrack {
                    video_id: video_id.to_string(),
                    language_code: lang.to_string(),
                    name: lang.to_string(),
                    is_generated: *generated,
                    base_url: format!("fake://{}/{}", video_id, i),
                })
                .collect())
        }

        async fn fetch_chunks(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptChunk>> {
            let index: usize = track.base_url.rsplit('/').next().unwrap().parse().unwrap();
            let (_, _, texts) = &self.videos[&track.video_id][index];
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptChunk::new(i as f64 * 2.0, 2.0, *text))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_fetch_transcript_joins_chunks() {
        let source = FakeSource::with_video("vid", vec![("pt", false, vec!["Hello", "world"])]);
        let text = fetch_transcript(&source, "vid", "pt").await.unwrap();
        assert_eq!(text, "Hello\nworld");
    }

    #[tokio::test]
    async fn test_no_fallback_to_other_language() {
        let source = FakeSource::with_video(
            "vid",
            vec![("pt", false, vec!["Olá"]), ("en", false, vec!["Hi"])],
        );

        match fetch_transcript(&source, "vid", "fr").await {
            Err(TranscriptError::TranscriptUnavailable { language, available, .. }) => {
                assert_eq!(language, "fr");
                assert_eq!(available, vec!["pt".to_string(), "en".to_string()]);
            }
            other => panic!("expected TranscriptUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_code_match_only() {
        let source = FakeSource::with_video("vid", vec![("pt-BR", false, vec!["Oi"])]);
        assert!(matches!(
            fetch_transcript(&source, "vid", "pt").await,
            Err(TranscriptError::TranscriptUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_track_preferred() {
        let source = FakeSource::with_video(
            "vid",
            vec![("en", true, vec!["auto words"]), ("en", false, vec!["Manual words"])],
        );
        assert_eq!(fetch_transcript(&source, "vid", "en").await.unwrap(), "Manual words");
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let source = FakeSource::with_video("vid", vec![]);
        assert!(matches!(
            fetch_transcript(&source, "other", "pt").await,
            Err(TranscriptError::LookupFailed { .. })
        ));
    }

    #[test]
    fn test_parse_caption_tracks() {
        let html = r#"<html><script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid&lang=pt","name":{"simpleText":"Portuguese"},"languageCode":"pt"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid&lang=en&kind=asr","name":{"runs":[{"text":"English (auto-generated)"}]},"languageCode":"en","kind":"asr"}]}},"videoDetails":{"title":"a };b"}};var meta = document.createElement('meta');</script></html>"#;

        let tracks = parse_caption_tracks(html, "vid").unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "pt");
        assert_eq!(tracks[0].name, "Portuguese");
        assert!(!tracks[0].is_generated);
        assert_eq!(tracks[1].name, "English (auto-generated)");
        assert!(tracks[1].is_generated);
    }

    #[test]
    fn test_parse_caption_tracks_without_captions() {
        let html = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"}};</script>"#;
        assert!(parse_caption_tracks(html, "vid").unwrap().is_empty());
    }

    #[test]
    fn test_parse_caption_tracks_unplayable() {
        let html = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}};</script>"#;
        let err = parse_caption_tracks(html, "vid").unwrap_err();
        assert!(err.to_string().contains("Video unavailable"));
        assert!(parse_caption_tracks("<html></html>", "vid").is_err());
    }

    #[test]
    fn test_parse_json3() {
        let body = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1500,"segs":[{"utf8":"Hello "},{"utf8":"there"}]},
            {"tStartMs":1500,"dDurationMs":10},
            {"tStartMs":1510,"dDurationMs":10,"segs":[{"utf8":"\n"}]},
            {"tStartMs":2000,"dDurationMs":1000,"segs":[{"utf8":"rock & roll"}]}
        ]}"#;

        let chunks = parse_json3(body, "vid").unwrap();
        assert_eq!(
            chunks,
            vec![
                TranscriptChunk::new(0.0, 1.5, "Hello there"),
                TranscriptChunk::new(2.0, 1.0, "rock & roll"),
            ]
        );
        assert!(parse_json3("", "vid").is_err());
    }

    #[test]
    fn test_parse_json3_keeps_text_verbatim() {
        let body = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"  indented line  "}]},
            {"tStartMs":1000,"dDurationMs":1000,"segs":[{"utf8":"AT&amp;T &lt;b&gt;"}]}
        ]}"#;

        let texts: Vec<String> = parse_json3(body, "vid")
            .unwrap()
            .into_iter()
            .map(|chunk| chunk.text)
            .collect();
        assert_eq!(texts, vec!["  indented line  ", "AT&amp;T &lt;b&gt;"]);
    }

    const CONSENT_HTML: &str = r#"<html><body>
        <form action="https://consent.youtube.com/s" method="POST">
            <input type="hidden" name="gl" value="DE">
            <input type="hidden" name="v" value="cb.20240101-00-p0.de+FX+123">
            <button>Accept all</button>
        </form></body></html>"#;

    const WATCH_HTML: &str = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid&lang=pt","languageCode":"pt"}]}}};</script>"#;

    #[test]
    fn test_consent_cookie() {
        assert!(is_consent_page(CONSENT_HTML));
        assert!(!is_consent_page(WATCH_HTML));
        assert_eq!(
            consent_cookie(CONSENT_HTML).as_deref(),
            Some("CONSENT=YES+cb.20240101-00-p0.de+FX+123")
        );
    }

    #[tokio::test]
    async fn test_consent_page_is_accepted_once() {
        let cookies = std::sync::Mutex::new(Vec::new());
        let html = accept_consent(CONSENT_HTML.to_string(), "vid", |cookie| {
            cookies.lock().unwrap().push(cookie);
            async { Ok::<_, TranscriptError>(WATCH_HTML.to_string()) }
        })
        .await
        .unwrap();

        assert_eq!(*cookies.lock().unwrap(), vec!["CONSENT=YES+cb.20240101-00-p0.de+FX+123"]);
        let tracks = parse_caption_tracks(&html, "vid").unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "pt");
    }

    #[tokio::test]
    async fn test_watch_page_skips_consent() {
        let html = accept_consent(WATCH_HTML.to_string(), "vid", |_| async {
            Err(TranscriptError::lookup_failed("vid", "unexpected refetch"))
        })
        .await
        .unwrap();
        assert_eq!(html, WATCH_HTML);
    }

    #[tokio::test]
    async fn test_repeated_consent_page_fails() {
        let err = accept_consent(CONSENT_HTML.to_string(), "vid", |_| async {
            Ok::<_, TranscriptError>(CONSENT_HTML.to_string())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, TranscriptError::LookupFailed { .. }));
        assert!(err.to_string().contains("consent page"));
    }

    #[test]
    fn test_json3_url() {
        let url = json3_url("https://www.youtube.com/api/timedtext?v=vid&lang=en&fmt=srv3").unwrap();
        assert_eq!(url, "https://www.youtube.com/api/timedtext?v=vid&lang=en&fmt=json3");
    }
}
