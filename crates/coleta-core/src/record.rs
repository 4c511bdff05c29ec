//! Canonical catalog record extracted from one source page.

use std::collections::BTreeMap;

use serde::Serialize;

/// Downloadable (or linkable) asset kinds attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Pdf,
    Epub,
    /// Link back to the item's catalog page. Listed in sinks but
    /// never fetched to disk.
    Original,
}

impl AssetKind {
    /// File extension for downloaded assets.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
            Self::Original => "html",
        }
    }

    /// Directory name under the per-language output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
            Self::Original => "original",
        }
    }

    /// Whether this kind is an actual file to download.
    pub fn is_downloadable(self) -> bool {
        !matches!(self, Self::Original)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Verification state of a single asset link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Unverified,
    Available,
    Unavailable,
}

/// One candidate asset URL and what the verifier decided about it.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub url: String,
    pub status: LinkStatus,
}

impl Link {
    /// A fresh, unverified link.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Unverified,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == LinkStatus::Available
    }
}

/// Tri-state printable flag; many payloads simply omit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Printable {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Printable {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unknown => "unknown",
        }
    }
}

/// Identity tuple deciding whether an item was already acquired.
///
/// Identity prefers the source-stable `code`; title-only sources fall
/// back to the title. Scoped by language so the same item in two
/// catalogs downloads once per language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub identity: String,
    pub language: String,
}

/// One normalized catalog entry.
///
/// Lives for a single page: built by the extractor, link statuses
/// filled in by the verifier, handed to the sink, then dropped.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub code: Option<String>,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Two-decimal price string, `"0.00"` when the payload had none.
    pub price: String,
    pub printable: Printable,
    pub language: String,
    pub links: BTreeMap<AssetKind, Link>,
}

impl Record {
    /// Source-stable identity: `code` when present, `title` otherwise.
    pub fn identity(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.title)
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            identity: self.identity().to_string(),
            language: self.language.clone(),
        }
    }

    /// Filesystem-safe stem for downloaded assets, `"{title} - {author}"`.
    pub fn file_stem(&self) -> String {
        crate::normalize::safe_filename(&format!("{} - {}", self.title, self.author))
    }

    /// The link URL for a kind, but only once verified available.
    pub fn available_url(&self, kind: AssetKind) -> Option<&str> {
        self.links
            .get(&kind)
            .filter(|l| l.is_available())
            .map(|l| l.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: Option<&str>) -> Record {
        Record {
            code: code.map(String::from),
            title: "The Attributes of God".to_string(),
            author: "A. W. Pink".to_string(),
            description: String::new(),
            price: "0.00".to_string(),
            printable: Printable::Unknown,
            language: "EN".to_string(),
            links: BTreeMap::new(),
        }
    }

    #[test]
    fn identity_prefers_code() {
        assert_eq!(record(Some("ATRG")).identity(), "ATRG");
        assert_eq!(record(None).identity(), "The Attributes of God");
    }

    #[test]
    fn dedup_key_scoped_by_language() {
        let mut es = record(Some("ATRG"));
        es.language = "ES".to_string();
        assert_ne!(record(Some("ATRG")).dedup_key(), es.dedup_key());
    }

    #[test]
    fn file_stem_combines_title_and_author() {
        assert_eq!(
            record(None).file_stem(),
            "The Attributes of God - A. W. Pink"
        );
    }

    #[test]
    fn available_url_requires_verification() {
        let mut rec = record(Some("ATRG"));
        rec.links
            .insert(AssetKind::Pdf, Link::new("http://x/a.pdf"));
        assert_eq!(rec.available_url(AssetKind::Pdf), None);

        rec.links.get_mut(&AssetKind::Pdf).unwrap().status = LinkStatus::Available;
        assert_eq!(rec.available_url(AssetKind::Pdf), Some("http://x/a.pdf"));
    }

    #[test]
    fn original_kind_is_not_downloadable() {
        assert!(AssetKind::Pdf.is_downloadable());
        assert!(AssetKind::Epub.is_downloadable());
        assert!(!AssetKind::Original.is_downloadable());
    }
}
