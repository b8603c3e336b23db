//! ListBucketResult XML parsing.
//!
//! The endpoint returns S3 listing documents (namespace
//! `http://s3.amazonaws.com/doc/2006-03-01/`): child directories under
//! `CommonPrefixes/Prefix`, files under `Contents/Key`, pagination via
//! `IsTruncated`/`NextMarker`. Matching is on local names, so both default
//! and prefixed namespace forms parse.

use crate::retry::TransferError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parsed form of one listing response page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Child directory prefixes (`CommonPrefixes/Prefix`), slash-terminated.
    pub prefixes: Vec<String>,
    /// File keys (`Contents/Key`), relative to the bucket root.
    pub keys: Vec<String>,
    /// True when the page is incomplete and a follow-up request is needed.
    pub truncated: bool,
    /// Marker to resume from when `truncated` is set.
    pub next_marker: Option<String>,
}

/// Parse one listing response body.
///
/// Fails with `TransferError::Parse` on malformed XML or when the document is
/// not a `ListBucketResult` (e.g. an HTML error page).
pub fn parse_listing(xml: &[u8]) -> Result<ListingPage, TransferError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut page = ListingPage::default();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(TransferError::Parse(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if stack.is_empty() {
                    if name != "ListBucketResult" {
                        return Err(TransferError::Parse(format!(
                            "unexpected root element <{}>",
                            name
                        )));
                    }
                    saw_root = true;
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| TransferError::Parse(e.to_string()))?;
                let current = stack.last().map(String::as_str).unwrap_or("");
                let parent = if stack.len() >= 2 {
                    stack[stack.len() - 2].as_str()
                } else {
                    ""
                };
                match (parent, current) {
                    ("CommonPrefixes", "Prefix") => page.prefixes.push(text.into_owned()),
                    ("Contents", "Key") => page.keys.push(text.into_owned()),
                    ("ListBucketResult", "IsTruncated") => {
                        page.truncated = text.trim().eq_ignore_ascii_case("true");
                    }
                    ("ListBucketResult", "NextMarker") => {
                        let marker = text.trim();
                        if !marker.is_empty() {
                            page.next_marker = Some(marker.to_string());
                        }
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(TransferError::Parse(
            "missing ListBucketResult root element".to_string(),
        ));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>data.binance.vision</Name>
  <Prefix>data/futures/</Prefix>
  <Marker></Marker>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>data/futures/README.zip</Key>
    <LastModified>2024-01-02T03:04:05.000Z</LastModified>
    <Size>1024</Size>
  </Contents>
  <CommonPrefixes>
    <Prefix>data/futures/cm/</Prefix>
  </CommonPrefixes>
  <CommonPrefixes>
    <Prefix>data/futures/um/</Prefix>
  </CommonPrefixes>
</ListBucketResult>"#;

    #[test]
    fn parses_prefixes_and_keys() {
        let page = parse_listing(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            page.prefixes,
            vec!["data/futures/cm/", "data/futures/um/"]
        );
        assert_eq!(page.keys, vec!["data/futures/README.zip"]);
        assert!(!page.truncated);
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn request_prefix_echo_is_not_a_child() {
        // The top-level <Prefix> echoes the request and must not be collected.
        let page = parse_listing(SAMPLE.as_bytes()).unwrap();
        assert!(!page.prefixes.iter().any(|p| p == "data/futures/"));
    }

    #[test]
    fn parses_truncated_page_with_marker() {
        let xml = r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <IsTruncated>true</IsTruncated>
  <NextMarker>data/spot/</NextMarker>
  <CommonPrefixes><Prefix>data/options/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        let page = parse_listing(xml.as_bytes()).unwrap();
        assert!(page.truncated);
        assert_eq!(page.next_marker.as_deref(), Some("data/spot/"));
    }

    #[test]
    fn empty_directory_parses_to_empty_page() {
        let xml = r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Prefix>data/empty/</Prefix>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;
        let page = parse_listing(xml.as_bytes()).unwrap();
        assert!(page.prefixes.is_empty());
        assert!(page.keys.is_empty());
    }

    #[test]
    fn html_error_page_is_a_parse_error() {
        let err = parse_listing(b"<html><body>403 Forbidden</body></html>").unwrap_err();
        assert!(matches!(err, TransferError::Parse(_)));
    }

    #[test]
    fn empty_body_is_a_parse_error() {
        assert!(matches!(
            parse_listing(b"").unwrap_err(),
            TransferError::Parse(_)
        ));
    }
}
