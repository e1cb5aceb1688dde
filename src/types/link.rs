use std::{collections::HashSet, fmt::Display, ops::Deref};

/// An absolute link to a single video, without query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoLink(String);

impl VideoLink {
    /// Only the scanner is allowed to create links, it is responsible
    /// for the invariants.
    pub(crate) fn new(link: String) -> Self {
        Self(link)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video links in first-discovery order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    links: Vec<VideoLink>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the link if it was never seen. Return whether it was added.
    pub fn push(&mut self, link: VideoLink) -> bool {
        if self.seen.insert(link.0.clone()) {
            self.links.push(link);
            true
        } else {
            false
        }
    }
}

impl Deref for LinkSet {
    type Target = [VideoLink];

    fn deref(&self) -> &Self::Target {
        &self.links
    }
}

impl IntoIterator for LinkSet {
    type Item = VideoLink;
    type IntoIter = std::vec::IntoIter<VideoLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl FromIterator<VideoLink> for LinkSet {
    fn from_iter<T: IntoIterator<Item = VideoLink>>(iter: T) -> Self {
        let mut set = Self::new();
        for link in iter {
            set.push(link);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_order() {
        let set: LinkSet = ["b", "a", "b", "c", "a"]
            .into_iter()
            .map(|s| VideoLink::new(s.to_owned()))
            .collect();

        let links: Vec<&str> = set.iter().map(VideoLink::as_str).collect();
        assert_eq!(links, ["b", "a", "c"]);
    }
}
