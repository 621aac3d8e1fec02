use std::fmt::{Display, Formatter};

use url::Url;

use crate::HashDigest;

/// The version control schemes recognized in direct URL requirements, as in `git+https://...`.
const VCS_SCHEMES: &[&str] = &["git", "hg", "svn", "bzr"];

/// A link to a distribution: a file on an index, a direct URL, a VCS reference or a local path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    url: Url,
    hashes: Vec<HashDigest>,
    yanked: Option<Yanked>,
    editable: bool,
}

impl Link {
    /// Create a [`Link`] for the given URL.
    ///
    /// Hashes embedded in the URL fragment (as in `#sha256=...`) are extracted.
    pub fn new(url: Url) -> Self {
        let hashes = url
            .fragment()
            .into_iter()
            .flat_map(|fragment| fragment.split('&'))
            .filter_map(|part| part.parse::<HashDigest>().ok())
            .collect();
        Self {
            url,
            hashes,
            yanked: None,
            editable: false,
        }
    }

    #[must_use]
    pub fn with_hashes(mut self, hashes: impl IntoIterator<Item = HashDigest>) -> Self {
        for hash in hashes {
            if !self.hashes.contains(&hash) {
                self.hashes.push(hash);
            }
        }
        self
    }

    #[must_use]
    pub fn with_yanked(mut self, yanked: Option<Yanked>) -> Self {
        self.yanked = yanked;
        self
    }

    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL with any fragment removed, as recorded in `direct_url.json`.
    pub fn url_without_fragment(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    pub fn hashes(&self) -> &[HashDigest] {
        &self.hashes
    }

    pub fn yanked(&self) -> Option<&Yanked> {
        self.yanked.as_ref()
    }

    /// Returns `true` if the index marked this file as yanked.
    pub fn is_yanked(&self) -> bool {
        self.yanked.as_ref().is_some_and(Yanked::is_yanked)
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Returns `true` if the link points at the local filesystem.
    pub fn is_file(&self) -> bool {
        self.url.scheme() == "file"
    }

    /// Returns `true` if the link points at a local directory (rather than an archive).
    pub fn is_existing_dir(&self) -> bool {
        self.is_file()
            && self
                .url
                .to_file_path()
                .is_ok_and(|path| path.is_dir())
    }

    /// Returns `true` if the link points at a wheel.
    pub fn is_wheel(&self) -> bool {
        self.filename()
            .is_some_and(|filename| filename.to_ascii_lowercase().ends_with(".whl"))
    }

    /// The version control system of the link, if it is a VCS link (e.g., `git`).
    pub fn vcs(&self) -> Option<&str> {
        let (prefix, _) = self.url.scheme().split_once('+')?;
        VCS_SCHEMES.contains(&prefix).then_some(prefix)
    }

    pub fn is_vcs(&self) -> bool {
        self.vcs().is_some()
    }

    /// The last path segment of the URL, if any.
    pub fn filename(&self) -> Option<&str> {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
    }

    /// The `subdirectory=` value of the URL fragment, if any.
    pub fn subdirectory(&self) -> Option<&str> {
        self.url.fragment().and_then(|fragment| {
            fragment
                .split('&')
                .find_map(|part| part.strip_prefix("subdirectory="))
        })
    }

    /// Returns `true` if this link carries one of the given hashes, or if no hashes are required.
    pub fn matches_hashes(&self, required: &[HashDigest]) -> bool {
        required.is_empty() || self.hashes.iter().any(|hash| required.contains(hash))
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// A yanked marker, as served by the index. Either a boolean or the reason for the yank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Yanked {
    Bool(bool),
    Reason(String),
}

impl Yanked {
    pub fn is_yanked(&self) -> bool {
        match self {
            Self::Bool(is_yanked) => *is_yanked,
            Self::Reason(_) => true,
        }
    }

    /// The reason given for the yank, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Reason(reason) if reason.is_empty() => None,
            Self::Reason(reason) => Some(reason),
        }
    }
}
