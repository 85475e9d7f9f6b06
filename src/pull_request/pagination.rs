//! Sequential page collection for provider list endpoints.
//!
//! Every adapter pages through its provider the same way: fetch one page,
//! keep its items, and ask the page for a continuation. Only the shape of the
//! continuation differs (a page number, an offset, a token, or a URL), so the
//! loop lives here once and adapters supply the page fetch as a closure.

use std::future::Future;

use http::HeaderMap;
use http::header::LINK;
use url::Url;

use super::error::ProviderError;

/// One page of results together with the continuation for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Page<T, C> {
    /// Items translated from this page.
    pub(crate) items: Vec<T>,
    /// Continuation for the following page; `None` when exhausted.
    pub(crate) next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub(crate) const fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }
}

/// Fetches pages until a page reports no continuation.
///
/// Pages are requested strictly one after another because each continuation
/// comes from the previous response. The first failure aborts the loop and
/// discards everything collected so far.
pub(crate) async fn collect_pages<T, C, F, Fut>(
    first: C,
    mut fetch_page: F,
) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<Page<T, C>, ProviderError>>,
{
    let mut collected = Vec::new();
    let mut cursor = first;
    let mut pages = 0_usize;
    loop {
        let page = fetch_page(cursor).await?;
        pages = pages.saturating_add(1);
        tracing::debug!(
            page = pages,
            items = page.items.len(),
            "fetched pull request page"
        );
        collected.extend(page.items);
        match page.next {
            Some(next) => cursor = next,
            None => return Ok(collected),
        }
    }
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_next_link)
}

fn parse_next_link(entry: &str) -> Option<Url> {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let is_next = parts.any(|parameter| {
        let compact: String = parameter.chars().filter(|ch| !ch.is_whitespace()).collect();
        compact == "rel=\"next\"" || compact == "rel=next"
    });
    if !is_next {
        return None;
    }
    let uri = target.strip_prefix('<')?.strip_suffix('>')?;
    Url::parse(uri).ok()
}
