//! Remote directory listing.
//!
//! Fetches `ListBucketResult` XML pages from the listing endpoint with curl
//! and enumerates one directory completely, following truncation markers.

mod parse;

pub use parse::{parse_listing, ListingPage};

use crate::config::BvdmConfig;
use crate::retry::{run_with_retry, RetryPolicy, TransferError};
use std::time::Duration;

/// Fully enumerated directory: child prefixes and file keys across all pages.
#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub prefixes: Vec<String>,
    pub keys: Vec<String>,
}

/// Listing request URL. The configured base already carries the
/// `delimiter=/&prefix=` query tail, so the prefix is appended verbatim.
fn listing_url(cfg: &BvdmConfig, prefix: &str, marker: Option<&str>) -> String {
    match marker {
        Some(m) => format!("{}{}&marker={}", cfg.listing_base_url, prefix, m),
        None => format!("{}{}", cfg.listing_base_url, prefix),
    }
}

/// One GET against the listing endpoint; buffers the body and parses it.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn fetch_page(
    cfg: &BvdmConfig,
    prefix: &str,
    marker: Option<&str>,
) -> Result<ListingPage, TransferError> {
    let url = listing_url(cfg, prefix, marker);
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&url)?;
    easy.useragent(&cfg.user_agent)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(cfg.listing_connect_timeout_secs))?;
    easy.timeout(Duration::from_secs(cfg.listing_timeout_secs))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    parse_listing(&body)
}

/// Enumerate one directory, retrying each page per `policy` and following
/// truncation markers until the directory is fully listed.
pub fn list_directory(
    cfg: &BvdmConfig,
    policy: &RetryPolicy,
    prefix: &str,
) -> Result<DirectoryListing, TransferError> {
    let mut out = DirectoryListing::default();
    let mut marker: Option<String> = None;
    loop {
        let page = run_with_retry(policy, || fetch_page(cfg, prefix, marker.as_deref()))?;
        // NextMarker is only guaranteed with a delimiter; fall back to the last
        // returned entry when the server omits it.
        let next = if page.truncated {
            page.next_marker
                .clone()
                .or_else(|| page.keys.last().cloned())
                .or_else(|| page.prefixes.last().cloned())
        } else {
            None
        };
        out.prefixes.extend(page.prefixes);
        out.keys.extend(page.keys);
        match next {
            Some(m) => marker = Some(m),
            None => break,
        }
    }
    Ok(out)
}
