use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::{
    outside::{MediaFetcher, PageRenderer, RenderPlan},
    types::{truncate_title, FormatCatalog, VideoLink, UNKNOWN_TITLE},
};

/// Lightweight way of getting a video title when the media fetcher has none
pub trait TitleProbe {
    /// Title shown on the video page, if any could be read
    fn probe_title(&self, link: &VideoLink) -> Option<String>;
}

/// Builds the quality-ranked format list of a video.
pub struct CatalogBuilder<'a> {
    fetcher: &'a dyn MediaFetcher,
    renderer: &'a dyn PageRenderer,
    settle: Duration,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(
        fetcher: &'a dyn MediaFetcher,
        renderer: &'a dyn PageRenderer,
        settle: Duration,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            settle,
        }
    }

    /// Query the formats of the video.
    ///
    /// Never fails: when the metadata cannot be obtained the catalog is
    /// empty, titled from the video page when that page can be read.
    pub fn build(&self, link: &VideoLink) -> FormatCatalog {
        info!("Getting available formats for {link}");

        match self.fetcher.probe(link.as_str()) {
            Ok(meta) => {
                let title = meta.title.as_deref().unwrap_or(UNKNOWN_TITLE);
                let catalog = FormatCatalog::new(title, link.clone(), &meta.formats);
                debug!(
                    "{} formats reported, {} with video",
                    meta.formats.len(),
                    catalog.formats.len()
                );
                catalog
            }
            Err(err) => {
                warn!("Could not get formats of {link}: {}", err.truncated(200));
                let title = self
                    .probe_title(link)
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_owned());
                FormatCatalog::empty(&title, link.clone())
            }
        }
    }
}

impl TitleProbe for CatalogBuilder<'_> {
    fn probe_title(&self, link: &VideoLink) -> Option<String> {
        let plan = RenderPlan::settle_only(self.settle);
        match self.renderer.render(link.as_str(), &plan) {
            Ok(html) => page_title(&html),
            Err(err) => {
                debug!("Title probe failed for {link}: {}", err.truncated(200));
                None
            }
        }
    }
}

/// First non-empty heading, or else the document title, of a page.
pub fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    ["h1", "title"].into_iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        doc.select(&selector)
            .map(|el| el.text().collect::<String>())
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|text| !text.is_empty())
            .map(|text| truncate_title(&text))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        outside::{FetchRequest, NoRenderer, Progress},
        result::{bail, Result},
        types::{QualityTier, RawFormat, VideoMetadata},
    };

    struct FakeFetcher {
        meta: Option<VideoMetadata>,
    }

    impl MediaFetcher for FakeFetcher {
        fn probe(&self, _url: &str) -> Result<VideoMetadata> {
            match &self.meta {
                Some(meta) => Ok(meta.clone()),
                None => bail("Unsupported URL"),
            }
        }

        fn fetch(&self, _: &FetchRequest<'_>, _: &mut dyn FnMut(&Progress)) -> Result<()> {
            unreachable!("catalog never downloads")
        }
    }

    struct PageWith {
        html: &'static str,
        renders: Cell<usize>,
    }

    impl PageRenderer for PageWith {
        fn render(&self, _url: &str, plan: &RenderPlan) -> Result<String> {
            assert_eq!(plan.max_scrolls, 0);
            self.renders.set(self.renders.get() + 1);
            Ok(self.html.to_owned())
        }
    }

    fn link() -> VideoLink {
        VideoLink::new("https://www.aparat.com/v/abc".to_owned())
    }

    fn format(id: &str, height: u32) -> RawFormat {
        RawFormat {
            format_id: id.to_owned(),
            ext: "mp4".to_owned(),
            height: Some(height),
            vcodec: Some("avc1".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_ranked_catalog() {
        let fetcher = FakeFetcher {
            meta: Some(VideoMetadata {
                title: Some("Lesson 1".to_owned()),
                formats: vec![format("360", 360), format("1080", 1080), format("720", 720)],
                ..Default::default()
            }),
        };
        let renderer = PageWith {
            html: "",
            renders: Cell::new(0),
        };
        let builder = CatalogBuilder::new(&fetcher, &renderer, Duration::ZERO);

        let catalog = builder.build(&link());
        assert_eq!(catalog.title, "Lesson 1");
        let tiers: Vec<QualityTier> = catalog.formats.iter().map(|f| f.quality).collect();
        assert_eq!(tiers, [QualityTier::P1080, QualityTier::P720, QualityTier::P360]);
        assert_eq!(renderer.renders.get(), 0);

        // Same data, same catalog
        assert_eq!(builder.build(&link()), catalog);
    }

    #[test]
    fn failed_probe_gives_empty_catalog_with_page_title() {
        let fetcher = FakeFetcher { meta: None };
        let renderer = PageWith {
            html: "<html><head><title>Site | Video</title></head><body><h1>  Real\n title </h1></body></html>",
            renders: Cell::new(0),
        };

        let catalog = CatalogBuilder::new(&fetcher, &renderer, Duration::ZERO).build(&link());
        assert!(catalog.is_empty());
        assert_eq!(catalog.title, "Real title");
        assert_eq!(renderer.renders.get(), 1);
    }

    #[test]
    fn failed_probe_without_renderer_uses_placeholder() {
        let fetcher = FakeFetcher { meta: None };
        let catalog = CatalogBuilder::new(&fetcher, &NoRenderer, Duration::ZERO).build(&link());

        assert!(catalog.is_empty());
        assert_eq!(catalog.title, UNKNOWN_TITLE);
        assert_eq!(catalog.link, link());
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let fetcher = FakeFetcher {
            meta: Some(VideoMetadata::default()),
        };
        let catalog = CatalogBuilder::new(&fetcher, &NoRenderer, Duration::ZERO).build(&link());
        assert_eq!(catalog.title, UNKNOWN_TITLE);
    }

    #[test]
    fn page_title_prefers_heading() {
        assert_eq!(
            page_title("<title>Doc</title><h1></h1>").as_deref(),
            Some("Doc")
        );
        assert_eq!(page_title("<p>nothing</p>"), None);
    }
}
