use tracing::{info, warn};
use url::Url;

use crate::{
    outside::{PageRenderer, RenderPlan, StaticFetcher},
    scanner::Scanner,
    types::LinkSet,
};

/// Collects the video links of a listing page.
///
/// The page is rendered first so that script-inserted and lazy-loaded
/// entries are present. When rendering is not possible, the raw page is
/// fetched instead.
pub struct Harvester<'a> {
    renderer: &'a dyn PageRenderer,
    fetcher: &'a dyn StaticFetcher,
    scanner: &'a Scanner,
    plan: RenderPlan,
}

impl<'a> Harvester<'a> {
    pub fn new(
        renderer: &'a dyn PageRenderer,
        fetcher: &'a dyn StaticFetcher,
        scanner: &'a Scanner,
        plan: RenderPlan,
    ) -> Self {
        Self {
            renderer,
            fetcher,
            scanner,
            plan,
        }
    }

    /// Return the links found on the page.
    ///
    /// Never fails: when neither the renderer nor the plain fetch can load
    /// the page, the result is empty and the caller decides what it means.
    pub fn harvest(&self, listing: &Url) -> LinkSet {
        info!("Rendering listing page {listing}");
        match self.renderer.render(listing.as_str(), &self.plan) {
            Ok(html) => return self.scanner.scan(&html, listing),
            Err(err) => warn!(
                "Could not render the page, falling back to a plain fetch: {}",
                err.truncated(200)
            ),
        }

        info!("Fetching listing page {listing}");
        match self.fetcher.get(listing.as_str()) {
            Ok(html) => self.scanner.scan(&html, listing),
            Err(err) => {
                warn!("Could not load the page: {}", err.truncated(200));
                LinkSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use super::*;
    use crate::{
        outside::scroll_until_stable,
        result::{bail, Error, Result},
        types::Platform,
    };

    /// Serves canned HTML, or fails when there is none
    struct Canned {
        html: Option<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl Canned {
        fn new(html: Option<&'static str>) -> Self {
            Self {
                html,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn serve(&self, url: &str) -> Result<String> {
            self.calls.borrow_mut().push(url.to_owned());
            match self.html {
                Some(html) => Ok(html.to_owned()),
                None => bail("connection refused"),
            }
        }
    }

    impl PageRenderer for Canned {
        fn render(&self, url: &str, plan: &RenderPlan) -> Result<String> {
            assert_eq!(plan.max_scrolls, 3);
            self.serve(url)
        }
    }

    impl StaticFetcher for Canned {
        fn get(&self, url: &str) -> Result<String> {
            self.serve(url)
        }
    }

    struct Absent;

    impl PageRenderer for Absent {
        fn render(&self, _url: &str, _plan: &RenderPlan) -> Result<String> {
            Err(Error::RendererUnavailable)
        }
    }

    /// Loads the page but loses the browser while scrolling
    struct ClosedMidScroll;

    impl PageRenderer for ClosedMidScroll {
        fn render(&self, _url: &str, plan: &RenderPlan) -> Result<String> {
            let mut height = 0;
            scroll_until_stable(
                plan.max_scrolls,
                plan.scroll_wait,
                || {
                    height += 500;
                    Ok(height)
                },
                || bail("no such window: target window already closed"),
            )?;
            Ok(r#"<a href="/v/rendered">r</a>"#.to_owned())
        }
    }

    fn plan() -> RenderPlan {
        RenderPlan {
            settle: Duration::ZERO,
            max_scrolls: 3,
            scroll_wait: Duration::ZERO,
        }
    }

    fn listing() -> Url {
        Url::parse("https://www.aparat.com/playlist/1").unwrap()
    }

    fn links(set: &LinkSet) -> Vec<&str> {
        set.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn rendered_page_wins() {
        let scanner = Scanner::new(Platform::default());
        let renderer = Canned::new(Some(r#"<a href="/v/rendered">r</a>"#));
        let fetcher = Canned::new(Some(r#"<a href="/v/static">s</a>"#));

        let found = Harvester::new(&renderer, &fetcher, &scanner, plan()).harvest(&listing());

        assert_eq!(links(&found), ["https://www.aparat.com/v/rendered"]);
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn falls_back_to_static_fetch() {
        let scanner = Scanner::new(Platform::default());
        let fetcher = Canned::new(Some(r#"<a href="/v/static">s</a>"#));

        let found = Harvester::new(&Absent, &fetcher, &scanner, plan()).harvest(&listing());
        assert_eq!(links(&found), ["https://www.aparat.com/v/static"]);

        let broken = Canned::new(None);
        let found = Harvester::new(&broken, &fetcher, &scanner, plan()).harvest(&listing());
        assert_eq!(links(&found), ["https://www.aparat.com/v/static"]);
        assert_eq!(*broken.calls.borrow(), ["https://www.aparat.com/playlist/1"]);
    }

    #[test]
    fn scroll_failure_falls_back_to_static_fetch() {
        let scanner = Scanner::new(Platform::default());
        let fetcher = Canned::new(Some(r#"<a href="/v/static">s</a>"#));

        let found = Harvester::new(&ClosedMidScroll, &fetcher, &scanner, plan()).harvest(&listing());

        assert_eq!(links(&found), ["https://www.aparat.com/v/static"]);
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn both_tiers_failing_gives_nothing() {
        let scanner = Scanner::new(Platform::default());
        let fetcher = Canned::new(None);

        let found = Harvester::new(&Absent, &fetcher, &scanner, plan()).harvest(&listing());
        assert!(found.is_empty());
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn rendered_page_without_links_is_not_retried() {
        let scanner = Scanner::new(Platform::default());
        let renderer = Canned::new(Some("<html></html>"));
        let fetcher = Canned::new(Some(r#"<a href="/v/static">s</a>"#));

        let found = Harvester::new(&renderer, &fetcher, &scanner, plan()).harvest(&listing());
        assert!(found.is_empty());
        assert!(fetcher.calls.borrow().is_empty());
    }
}
