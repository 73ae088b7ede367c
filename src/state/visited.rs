use crate::url::normalize_url;
use std::collections::HashMap;
use url::Url;

/// Outcome of recording a URL in the visited set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// First time this page is seen; carries its arena index
    New(usize),
    /// The page was already visited under this index
    Seen(usize),
}

impl Visit {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    /// Arena index of the page
    pub fn id(&self) -> usize {
        match self {
            Self::New(id) | Self::Seen(id) => *id,
        }
    }
}

/// Set of normalized URLs already fetched in the current crawl
///
/// Pages are stored in an arena in visit order, keyed by their normalized
/// form, so that cycle detection is an explicit lookup rather than a
/// recursion limit.
#[derive(Debug, Default)]
pub struct VisitedSet {
    arena: Vec<Url>,
    index: HashMap<String, usize>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL, returning whether it was new
    pub fn visit(&mut self, url: &Url) -> Visit {
        let key = identity(url);
        if let Some(&id) = self.index.get(&key) {
            return Visit::Seen(id);
        }

        let id = self.arena.len();
        self.arena.push(url.clone());
        self.index.insert(key, id);
        Visit::New(id)
    }

    /// Returns true if the URL (or a cosmetic variant of it) was visited
    pub fn contains(&self, url: &Url) -> bool {
        self.index.contains_key(&identity(url))
    }

    /// Arena index of a visited URL, without recording it
    pub fn lookup(&self, url: &Url) -> Option<usize> {
        self.index.get(&identity(url)).copied()
    }

    /// The URLs visited so far, in visit order
    pub fn pages(&self) -> &[Url] {
        &self.arena
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

/// Normalized identity of a URL, falling back to its raw form
fn identity(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
