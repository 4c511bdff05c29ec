//! Mapping from the Chapel Library books API to catalog records.

use std::collections::BTreeMap;

use serde::Deserialize;

use coleta_core::normalize::{normalize_price, strip_markup, UNKNOWN_AUTHOR};
use coleta_core::{AssetKind, ExtractError, Link, Printable, Record, Source};

const DEFAULT_BASE_URL: &str = "https://www.chapellibrary.org";
const PAGE_SIZE: u32 = 10;

/// One book as the API serializes it. Most fields are optional in
/// practice; only `code` is stable enough to hang identity on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBook {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    authors: Vec<ApiAuthor>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    has_printable_version: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    name: Option<String>,
}

/// The Chapel Library books API.
pub struct ChapelLibrary {
    base_url: String,
}

impl ChapelLibrary {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point at a different host (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    fn to_record(&self, book: ApiBook, language: &str) -> Option<Record> {
        let title = book.title.as_deref()?.trim().to_string();
        if title.is_empty() {
            return None;
        }

        let author = book
            .authors
            .first()
            .and_then(|a| a.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();

        let mut links = BTreeMap::new();
        if let Some(code) = book.code.as_deref() {
            links.insert(
                AssetKind::Pdf,
                Link::new(format!(
                    "{}/api/books/download?code={code}&format=pdf",
                    self.base_url
                )),
            );
            links.insert(
                AssetKind::Epub,
                Link::new(format!(
                    "{}/api/books/download?code={code}&format=epub",
                    self.base_url
                )),
            );
            links.insert(
                AssetKind::Original,
                Link::new(format!("{}/book/{code}/", self.base_url)),
            );
        }

        Some(Record {
            code: book.code,
            title,
            author,
            description: strip_markup(book.description.as_deref().unwrap_or_default()),
            price: normalize_price(book.price),
            printable: Printable::from_flag(book.has_printable_version),
            language: language.to_string(),
            links,
        })
    }
}

impl Default for ChapelLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for ChapelLibrary {
    fn name(&self) -> &str {
        "chapel"
    }

    fn page_url(&self, language: &str, page: u32) -> String {
        format!(
            "{}/api/books?pageSize={PAGE_SIZE}&pageCount={page}&language={language}&sortby=title",
            self.base_url
        )
    }

    /// A page is a JSON array of books. The API is supposed to filter
    /// by language server-side, but stray entries do appear, so the
    /// requested language is enforced here as well.
    fn extract(&self, payload: &str, language: &str) -> Result<Vec<Record>, ExtractError> {
        let books: Vec<ApiBook> =
            serde_json::from_str(payload).map_err(|e| ExtractError::new(e.to_string()))?;

        Ok(books
            .into_iter()
            .filter(|book| match book.language.as_deref() {
                Some(lang) => lang.eq_ignore_ascii_case(language),
                None => true,
            })
            .filter_map(|book| self.to_record(book, language))
            .collect())
    }
}
