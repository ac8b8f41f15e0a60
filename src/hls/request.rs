//! HTTP request classification
//!
//! Maps a request path onto the HLS artifact it asks for. Only the suffix and
//! the final path segment matter; the directory part is up to the router.

use crate::error::{Error, Result};

use super::playlist::PLAYLIST_CONTENT_TYPE;
use super::segmenter::SEGMENT_CONTENT_TYPE;

/// An HLS request resolved from its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HlsRequest {
    /// `/…/{stream_id}.m3u8`
    Playlist { stream_id: String },
    /// `/…/{stream_id}_{n}.ts`
    Segment { stream_id: String, name: String },
}

impl HlsRequest {
    /// Classify a request path
    ///
    /// Anything that is not a playlist or segment path is rejected with
    /// `Error::UnsupportedRequest`.
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        let unsupported = || Error::UnsupportedRequest(path.to_string());

        if let Some(stream_id) = file.strip_suffix(".m3u8") {
            if stream_id.is_empty() {
                return Err(unsupported());
            }
            return Ok(HlsRequest::Playlist {
                stream_id: stream_id.to_string(),
            });
        }

        if let Some(stem) = file.strip_suffix(".ts") {
            let (stream_id, _) = stem.rsplit_once('_').ok_or_else(unsupported)?;
            if stream_id.is_empty() {
                return Err(unsupported());
            }
            return Ok(HlsRequest::Segment {
                stream_id: stream_id.to_string(),
                name: file.to_string(),
            });
        }

        Err(unsupported())
    }

    /// Id of the stream this request belongs to
    pub fn stream_id(&self) -> &str {
        match self {
            HlsRequest::Playlist { stream_id } | HlsRequest::Segment { stream_id, .. } => {
                stream_id
            }
        }
    }

    /// HTTP `Content-Type` of the response body
    pub fn content_type(&self) -> &'static str {
        match self {
            HlsRequest::Playlist { .. } => PLAYLIST_CONTENT_TYPE,
            HlsRequest::Segment { .. } => SEGMENT_CONTENT_TYPE,
        }
    }
}
