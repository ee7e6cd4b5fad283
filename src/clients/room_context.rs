use url::{form_urlencoded, Url};
use uuid::Uuid;

use super::locks_client::ClientError;

/// Routing key plus identity a client needs to join a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomContext {
    pub session_id: String,
    pub story_id: String,
    pub slide: u32,
    pub device_token: String,
}

impl RoomContext {
    /// `None` when any routing component is missing: coordination does not apply.
    /// Slide numbers start at 1; slide 0 means no slide is selected.
    pub fn new(session_id: &str, story_id: &str, slide: u32, device_token: &str) -> Option<Self> {
        let session_id = session_id.trim();
        let story_id = story_id.trim();
        if session_id.is_empty() || story_id.is_empty() || slide == 0 {
            return None;
        }
        let device_token = match device_token.trim() {
            "" => Uuid::new_v4().to_string(),
            token => token.to_string(),
        };
        Some(Self {
            session_id: session_id.to_string(),
            story_id: story_id.to_string(),
            slide,
            device_token,
        })
    }

    /// Read `session`, `story`, `slide` and `deviceToken` from a page query
    /// string. Story ids use dashes on the wire, so underscores are rewritten.
    pub fn from_query(query: &str) -> Option<Self> {
        let mut session_id = String::new();
        let mut story_id = String::new();
        let mut slide = 0;
        let mut device_token = String::new();
        for (name, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match name.as_ref() {
                "session" => session_id = value.into_owned(),
                "story" => story_id = value.replace('_', "-"),
                "slide" => slide = value.trim().parse().unwrap_or(0),
                "deviceToken" => device_token = value.into_owned(),
                _ => {}
            }
        }
        Self::new(&session_id, &story_id, slide, &device_token)
    }

    /// Room URL under `base`, e.g. `ws://host:8000/ws/{session}/{story}/{slide}`.
    pub fn ws_url(&self, base: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(base)?;
        let slide = self.slide.to_string();
        url.path_segments_mut()
            .map_err(|_| ClientError::UnsupportedBaseUrl(base.to_string()))?
            .pop_if_empty()
            .extend(["ws", self.session_id.as_str(), self.story_id.as_str(), slide.as_str()]);
        Ok(url)
    }
}
