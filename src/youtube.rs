//! Fuente de comentarios: YouTube Data API v3.
//!
//! API pública:
//!   - `extract_video_id(&str)` para las formas de URL habituales.
//!   - `CommentSource`, el contrato que usa el pipeline.
//!   - `YouTubeClient`, la implementación HTTP con `reqwest`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{config::AppConfig, models::Comment};

/// Máximo de resultados por página que acepta `commentThreads`.
const PAGE_SIZE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Video no encontrado: {0}")]
    NotFound(String),
    #[error("No se pudo contactar con YouTube: {0}")]
    Unavailable(String),
    #[error("YouTube API no configurada (falta YOUTUBE_API_KEY)")]
    Unconfigured,
}

/// Comentarios (en orden de relevancia) y título del video.
#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub title: String,
    pub comments: Vec<Comment>,
}

#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch(&self, video_id: &str, max_results: u32) -> Result<FetchedVideo, SourceError>;
}

/// Extrae el identificador de video de una URL de YouTube.
///
/// Formas aceptadas: `youtube.com/watch?v=ID`, `youtu.be/ID`,
/// `youtube.com/embed/ID` y `youtube.com/v/ID`, con o sin esquema.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let url = Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{raw}")))
        .ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("v") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

// --- Respuestas de la API (sólo los campos que usamos) ---

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
    #[serde(default)]
    author_display_name: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    like_count: u64,
}

impl From<CommentThread> for Comment {
    fn from(thread: CommentThread) -> Self {
        let top = thread.snippet.top_level_comment;
        Comment {
            id: top.id,
            text: top.snippet.text_display,
            author: top.snippet.author_display_name,
            published_at: top.snippet.published_at,
            like_count: top.snippet.like_count,
        }
    }
}

/// Cliente HTTP de la YouTube Data API.
#[derive(Debug, Clone)]
/// Respuesta de la API: cuerpo tipado o estado de error con su cuerpo en bruto.
enum ApiReply<T> {
    Body(T),
    Failed { status: StatusCode, body: String },
}

/// Una página vacía termina la paginación aunque traiga token.
fn next_page_token(items_on_page: usize, token: Option<String>) -> Option<String> {
    match token {
        Some(token) if items_on_page > 0 && !token.is_empty() => Some(token),
        _ => None,
    }
}

/// `commentThreads` responde 403 con la razón `commentsDisabled` cuando el
/// video no admite comentarios; otros 403 (cuota, clave) siguen siendo errores.
fn comments_disabled(status: StatusCode, body: &str) -> bool {
    status == StatusCode::FORBIDDEN && body.contains("commentsDisabled")
}

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.youtube_api_key.clone(), cfg.youtube_api_base.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<ApiReply<T>, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ApiReply::Failed { status, body });
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Unavailable(format!("respuesta inválida de {endpoint}: {e}")))?;
        Ok(ApiReply::Body(body))
    }

    async fn fetch_title(&self, key: &str, video_id: &str) -> Result<String, SourceError> {
        let params = [
            ("part", "snippet".to_string()),
            ("id", video_id.to_string()),
            ("key", key.to_string()),
        ];
        match self.get_json::<VideoListResponse>("videos", &params).await? {
            ApiReply::Body(body) => body
                .items
                .into_iter()
                .next()
                .map(|item| item.snippet.title)
                .ok_or_else(|| SourceError::NotFound(video_id.to_string())),
            ApiReply::Failed { status: StatusCode::NOT_FOUND, .. } => {
                Err(SourceError::NotFound(video_id.to_string()))
            }
            ApiReply::Failed { status, .. } => {
                Err(SourceError::Unavailable(format!("videos respondió {status}")))
            }
        }
    }

    async fn fetch_comments(
        &self,
        key: &str,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<Comment>, SourceError> {
        let mut comments: Vec<Comment> = Vec::new();
        let mut page_token: Option<String> = None;

        while (comments.len() as u32) < max_results {
            let remaining = max_results - comments.len() as u32;
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("videoId", video_id.to_string()),
                ("maxResults", remaining.min(PAGE_SIZE_LIMIT).to_string()),
                ("order", "relevance".to_string()),
                ("textFormat", "plainText".to_string()),
                ("key", key.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page = match self
                .get_json::<CommentThreadListResponse>("commentThreads", &params)
                .await?
            {
                ApiReply::Body(page) => page,
                ApiReply::Failed { status, body } if comments_disabled(status, &body) => {
                    info!("El video {video_id} tiene los comentarios desactivados.");
                    break;
                }
                ApiReply::Failed { status: StatusCode::NOT_FOUND, .. } => {
                    return Err(SourceError::NotFound(video_id.to_string()))
                }
                ApiReply::Failed { status, .. } => {
                    return Err(SourceError::Unavailable(format!("commentThreads respondió {status}")))
                }
            };

            debug!("Página de comentarios con {} elementos para {}", page.items.len(), video_id);
            page_token = next_page_token(page.items.len(), page.next_page_token);
            comments.extend(page.items.into_iter().map(Comment::from));

            if page_token.is_none() {
                break;
            }
        }

        comments.truncate(max_results as usize);
        Ok(comments)
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    async fn fetch(&self, video_id: &str, max_results: u32) -> Result<FetchedVideo, SourceError> {
        let key = self.api_key.as_deref().ok_or(SourceError::Unconfigured)?;

        let title = self.fetch_title(key, video_id).await?;
        let comments = self.fetch_comments(key, video_id, max_results).await?;

        info!("Obtenidos {} comentarios de '{}' ({})", comments.len(), title, video_id);
        Ok(FetchedVideo { title, comments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_standard_short_and_embed_links() {
        for url in [
            "https://www.youtube.com/watch?v=ABC123",
            "https://youtu.be/ABC123",
            "https://www.youtube.com/embed/ABC123",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("ABC123"), "{url}");
        }
    }

    #[test]
    fn test_extracts_other_shapes() {
        assert_eq!(extract_video_id("https://www.youtube.com/v/ABC123").as_deref(), Some("ABC123"));
        assert_eq!(extract_video_id("youtube.com/watch?v=ABC123").as_deref(), Some("ABC123"));
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("https://youtu.be/ABC123?t=10").as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_rejects_non_video_urls() {
        assert_eq!(extract_video_id("https://example.com/not-a-video"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?list=PL123"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("not a url at all"), None);
    }

    #[test]
    fn test_comment_thread_deserialization() {
        let body = r#"{
            "nextPageToken": "abc",
            "items": [{
                "snippet": {
                    "topLevelComment": {
                        "id": "Ugx1",
                        "snippet": {
                            "textDisplay": "Great video!",
                            "authorDisplayName": "@someone",
                            "publishedAt": "2024-03-01T10:00:00Z",
                            "likeCount": 12
                        }
                    }
                }
            }]
        }"#;
        let page: CommentThreadListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let comment = Comment::from(page.items.into_iter().next().unwrap());
        assert_eq!(comment.id, "Ugx1");
        assert_eq!(comment.text, "Great video!");
        assert_eq!(comment.like_count, 12);
    }

    #[test]
    fn test_pagination_stops_on_empty_or_last_page() {
        assert_eq!(next_page_token(20, Some("next".to_string())).as_deref(), Some("next"));
        assert_eq!(next_page_token(0, Some("next".to_string())), None);
        assert_eq!(next_page_token(20, Some(String::new())), None);
        assert_eq!(next_page_token(20, None), None);
    }

    #[test]
    fn test_disabled_comments_are_told_apart_from_other_forbidden_replies() {
        let disabled = r#"{"error": {"code": 403, "errors": [{"domain": "youtube.commentThread",
            "reason": "commentsDisabled"}]}}"#;
        let quota = r#"{"error": {"code": 403, "errors": [{"domain": "youtube.quota",
            "reason": "quotaExceeded"}]}}"#;

        assert!(comments_disabled(StatusCode::FORBIDDEN, disabled));
        assert!(!comments_disabled(StatusCode::FORBIDDEN, quota));
        assert!(!comments_disabled(StatusCode::INTERNAL_SERVER_ERROR, disabled));
    }

    #[tokio::test]
    async fn test_fetch_without_key_is_unconfigured() {
        let client = YouTubeClient::new(None, "http://127.0.0.1:9");
        assert!(!client.is_configured());
        let err = client.fetch("ABC123", 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Unconfigured));
    }
}
