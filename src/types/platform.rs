use serde::Deserialize;

/// The video platform the listing pages belong to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Platform {
    /// Host used to rebuild canonical video URLs, e.g. `www.aparat.com`
    pub host: String,

    /// Domain a URL must mention to be considered part of the platform
    pub domain: String,

    /// Path segment that identifies a single-video URL, e.g. `/v/`
    pub marker: String,
}

impl Platform {
    /// Canonical URL of the video with the given identifier.
    pub fn video_url(&self, id: &str) -> String {
        format!("https://{}{}{id}", self.host, self.marker)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            host: "www.aparat.com".to_owned(),
            domain: "aparat.com".to_owned(),
            marker: "/v/".to_owned(),
        }
    }
}
