use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, trace};
use url::Url;

use crate::types::{LinkSet, Platform, VideoLink};

/// Finds the video links of a page in its anchors, frames and inline scripts.
#[derive(Debug)]
pub struct Scanner {
    platform: Platform,
    /// Marker followed by a video identifier, inside script bodies
    script_re: Regex,
    anchors: Selector,
    frames: Selector,
    scripts: Selector,
}

impl Scanner {
    pub fn new(platform: Platform) -> Self {
        let script_re = Regex::new(&format!(
            "{}([A-Za-z0-9_-]+)",
            regex::escape(&platform.marker)
        ))
        .unwrap();

        Self {
            platform,
            script_re,
            anchors: Selector::parse("a[href]").unwrap(),
            frames: Selector::parse("iframe[src]").unwrap(),
            scripts: Selector::parse("script").unwrap(),
        }
    }

    /// Collect the video links of the page.
    ///
    /// Anchors come first, then frames, then links rebuilt from scripts.
    /// Within a channel, links keep the document order. Duplicates keep
    /// their first position. No link at all is a valid result.
    pub fn scan(&self, html: &str, base: &Url) -> LinkSet {
        let doc = Html::parse_document(html);
        let mut links = LinkSet::new();

        let anchors = doc
            .select(&self.anchors)
            .filter_map(|el| el.value().attr("href"));
        let added = self.push_all(&mut links, anchors.filter_map(|href| self.resolve(href, base)));
        debug!("{added} links from anchors");

        let frames = doc
            .select(&self.frames)
            .filter_map(|el| el.value().attr("src"));
        let added = self.push_all(&mut links, frames.filter_map(|src| self.resolve(src, base)));
        debug!("{added} links from frames");

        let mut added = 0;
        for script in doc.select(&self.scripts) {
            let body: String = script.text().collect();
            let ids = self
                .script_re
                .captures_iter(&body)
                .filter_map(|cap| cap.get(1))
                .map(|id| VideoLink::new(self.platform.video_url(id.as_str())));
            added += self.push_all(&mut links, ids);
        }
        debug!("{added} links from scripts");

        links
    }

    fn push_all(&self, links: &mut LinkSet, candidates: impl Iterator<Item = VideoLink>) -> usize {
        candidates
            .filter(|link| {
                trace!("Candidate {link}");
                links.push(link.clone())
            })
            .count()
    }

    /// Turn an `href`/`src` into a video link if it points to a platform video.
    ///
    /// Root-relative and protocol-relative references are joined with the base,
    /// other relative references are ignored.
    fn resolve(&self, reference: &str, base: &Url) -> Option<VideoLink> {
        let reference = reference.trim();
        let mut url = if reference.starts_with('/') {
            base.join(reference).ok()?
        } else {
            Url::parse(reference).ok()?
        };

        if !matches!(url.scheme(), "http" | "https") || !self.is_platform_host(&url) {
            return None;
        }

        url.set_query(None);
        url.set_fragment(None);

        url.path()
            .contains(&self.platform.marker)
            .then(|| VideoLink::new(url.into()))
    }

    fn is_platform_host(&self, url: &Url) -> bool {
        let domain = self.platform.domain.as_str();
        url.host_str().is_some_and(|host| {
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|sub| sub.ends_with('.'))
        })
    }
}
