use serde::{Deserialize, Serialize};

use crate::Link;

/// Metadata for a distribution that was installed via a direct URL.
///
/// See: <https://packaging.python.org/en/latest/specifications/direct-url-data-structure/>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", untagged)]
pub enum DirectUrl {
    /// The direct URL is a local directory. For example:
    /// ```json
    /// {"url": "file:///home/user/project", "dir_info": {}}
    /// ```
    LocalDirectory { url: String, dir_info: DirInfo },
    /// The direct URL is a path to an archive. For example:
    /// ```json
    /// {"archive_info": {"hash": "sha256=75909db2664838d015e3d9139004ee16711748a52c8f336b52882266540215d8"}, "url": "https://files.pythonhosted.org/packages/b8/8b/31273bf66016be6ad22bb7345c37ff350276cfd46e389a0c2ac5da9d9073/wheel-0.41.2-py3-none-any.whl"}
    /// ```
    ArchiveUrl {
        url: String,
        archive_info: ArchiveInfo,
        #[serde(skip_serializing_if = "Option::is_none")]
        subdirectory: Option<String>,
    },
    /// The direct URL is path to a VCS repository. For example:
    /// ```json
    /// {"url": "https://github.com/pallets/flask.git", "vcs_info": {"commit_id": "8d9519df093864ff90ca446d4af2dc8facd3c542", "vcs": "git"}}
    /// ```
    VcsUrl {
        url: String,
        vcs_info: VcsInfo,
        #[serde(skip_serializing_if = "Option::is_none")]
        subdirectory: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArchiveInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VcsInfo {
    pub vcs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_revision: Option<String>,
}

impl DirectUrl {
    /// Compute the provenance record a distribution installed from the given link would carry.
    pub fn from_link(link: &Link) -> Self {
        let subdirectory = link.subdirectory().map(ToString::to_string);

        if let Some(vcs) = link.vcs() {
            // `git+https://github.com/pallets/flask.git@8d9519df` is recorded as the repository
            // URL, with the revision split out.
            let url = link.url_without_fragment();
            let repository = url
                .as_str()
                .strip_prefix(&format!("{vcs}+"))
                .unwrap_or(url.as_str());
            let (repository, revision) = match repository.rsplit_once('@') {
                Some((repository, revision)) if !revision.contains('/') => {
                    (repository.to_string(), Some(revision.to_string()))
                }
                _ => (repository.to_string(), None),
            };
            let commit_id = revision.clone().filter(|revision| is_commit(revision));
            return Self::VcsUrl {
                url: repository,
                vcs_info: VcsInfo {
                    vcs: vcs.to_string(),
                    commit_id,
                    requested_revision: revision,
                },
                subdirectory,
            };
        }

        if link.is_existing_dir() {
            return Self::LocalDirectory {
                url: link.url_without_fragment().to_string(),
                dir_info: DirInfo {
                    editable: link.is_editable().then_some(true),
                },
            };
        }

        Self::ArchiveUrl {
            url: link.url_without_fragment().to_string(),
            archive_info: ArchiveInfo {
                hash: link
                    .hashes()
                    .first()
                    .map(|hash| format!("{}={}", hash.algorithm, hash.digest)),
            },
            subdirectory,
        }
    }

    /// The URL recorded for the distribution.
    pub fn url(&self) -> &str {
        match self {
            Self::LocalDirectory { url, .. }
            | Self::ArchiveUrl { url, .. }
            | Self::VcsUrl { url, .. } => url,
        }
    }

    /// Returns `true` if a distribution with this provenance is the artifact the other record
    /// describes.
    ///
    /// VCS records only match on a pinned commit, since a branch or tag may have moved since the
    /// installation.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::LocalDirectory { url, dir_info },
                Self::LocalDirectory {
                    url: other_url,
                    dir_info: other_dir_info,
                },
            ) => {
                url == other_url
                    && dir_info.editable.unwrap_or(false)
                        == other_dir_info.editable.unwrap_or(false)
            }
            (
                Self::ArchiveUrl {
                    url, subdirectory, ..
                },
                Self::ArchiveUrl {
                    url: other_url,
                    subdirectory: other_subdirectory,
                    ..
                },
            ) => url == other_url && subdirectory == other_subdirectory,
            (
                Self::VcsUrl {
                    url,
                    vcs_info,
                    subdirectory,
                },
                Self::VcsUrl {
                    url: other_url,
                    vcs_info: other_vcs_info,
                    subdirectory: other_subdirectory,
                },
            ) => {
                url == other_url
                    && subdirectory == other_subdirectory
                    && vcs_info.vcs == other_vcs_info.vcs
                    && vcs_info.commit_id.is_some()
                    && vcs_info.commit_id == other_vcs_info.commit_id
            }
            _ => false,
        }
    }
}

/// Returns `true` if the revision looks like a full commit hash.
fn is_commit(revision: &str) -> bool {
    revision.len() == 40 && revision.chars().all(|c| c.is_ascii_hexdigit())
}
