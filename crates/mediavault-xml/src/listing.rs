//! ListObjectsV2 response parsing.
//!
//! See <https://docs.aws.amazon.com/AmazonS3/latest/API/API_ListObjectsV2.html>.
//!
//! Page-level fields go through serde. `<Contents>` and `<CommonPrefixes>`
//! blocks are cut out with the pull reader and deserialized one at a time, so
//! a malformed record is dropped without losing the rest of the page.

use std::ops::Range;

use chrono::{DateTime, Utc};
use mediavault_core::{ListedEntry, ListingPage};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::XmlError;

const LISTING_ROOT: &[u8] = b"ListBucketResult";
const ERROR_ROOT: &[u8] = b"Error";

/// Page-level fields of a ListObjectsV2 response. Records are read separately.
#[derive(Debug, Deserialize)]
#[serde(rename = "ListBucketResult")]
struct ListBucketResult {
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "NextContinuationToken")]
    next_continuation_token: Option<String>,
}

/// One `<Contents>` record. Every field is optional so that a bad record can
/// be skipped instead of failing the page.
#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: Option<String>,
    #[serde(rename = "LastModified")]
    last_modified: Option<String>,
    #[serde(rename = "Size")]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommonPrefix {
    #[serde(rename = "Prefix")]
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct ServiceError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// Raw record blocks, in document order within each kind.
#[derive(Debug, Default)]
struct RecordBlocks<'a> {
    contents: Vec<&'a str>,
    prefixes: Vec<&'a str>,
}

/// Parse one page of a ListObjectsV2 response.
///
/// Common prefixes become directory entries and objects become file entries;
/// directories come first, each group in document order. Keys ending in `/`
/// are folder markers and are skipped, as are records that are missing a
/// field, repeat or nest one, or carry an unparseable size or timestamp.
///
/// # Errors
///
/// Returns [`XmlError::Service`] for an S3 `<Error>` document,
/// [`XmlError::UnexpectedDocument`] for any other non-listing body,
/// [`XmlError::Syntax`] when the markup is broken, and
/// [`XmlError::Deserialize`] when the page-level fields are malformed.
///
/// # Examples
///
/// ```
/// use mediavault_xml::parse_listing;
///
/// let page = parse_listing(
///     "<ListBucketResult>\
///        <CommonPrefixes><Prefix>youth/</Prefix></CommonPrefixes>\
///      </ListBucketResult>",
/// )
/// .unwrap();
/// assert_eq!(page.entries.len(), 1);
/// assert!(page.entries[0].is_directory);
/// assert!(!page.is_truncated);
/// ```
pub fn parse_listing(xml: &str) -> Result<ListingPage, XmlError> {
    match root_element(xml).as_deref() {
        Some(ERROR_ROOT) => {
            let error: ServiceError = quick_xml::de::from_str(xml)?;
            return Err(XmlError::Service {
                code: error.code,
                message: error.message.unwrap_or_default(),
            });
        }
        Some(LISTING_ROOT) => {}
        _ => return Err(XmlError::UnexpectedDocument),
    }

    let page: ListBucketResult = quick_xml::de::from_str(xml)?;
    let blocks = record_blocks(xml)?;

    let directories = blocks
        .prefixes
        .into_iter()
        .filter_map(|inner| parse_block::<CommonPrefix>("CommonPrefixes", inner))
        .filter_map(|p| p.prefix)
        .filter(|p| !p.is_empty())
        .map(ListedEntry::directory);
    let files = blocks
        .contents
        .into_iter()
        .filter_map(|inner| parse_block::<Contents>("Contents", inner))
        .filter_map(file_entry);
    let entries: Vec<ListedEntry> = directories.chain(files).collect();

    let next_cursor = page
        .next_continuation_token
        .filter(|token| !token.is_empty());

    Ok(ListingPage {
        entries,
        is_truncated: page.is_truncated,
        next_cursor,
    })
}

/// Local name of the document's root element, or `None` when there is none.
fn root_element(xml: &str) -> Option<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return Some(e.local_name().as_ref().to_vec());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Collect the inner text of every `<Contents>` and `<CommonPrefixes>` child
/// of the root element.
fn record_blocks(xml: &str) -> Result<RecordBlocks<'_>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut blocks = RecordBlocks::default();
    let mut in_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if !in_root => {
                in_root = e.local_name().as_ref() == LISTING_ROOT;
            }
            Event::Start(e) => {
                let span = reader.read_to_end(e.name())?;
                let target = match e.local_name().as_ref() {
                    b"Contents" => &mut blocks.contents,
                    b"CommonPrefixes" => &mut blocks.prefixes,
                    _ => continue,
                };
                if let Some(inner) = slice(xml, span) {
                    target.push(inner);
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    Ok(blocks)
}

fn slice(xml: &str, span: Range<u64>) -> Option<&str> {
    let start = usize::try_from(span.start).ok()?;
    let end = usize::try_from(span.end).ok()?;
    xml.get(start..end)
}

fn parse_block<T: DeserializeOwned>(element: &str, inner: &str) -> Option<T> {
    let wrapped = format!("<{element}>{inner}</{element}>");
    match quick_xml::de::from_str(&wrapped) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(element, error = %e, "skipping malformed listing record");
            None
        }
    }
}

fn file_entry(record: Contents) -> Option<ListedEntry> {
    let Some(key) = record.key.filter(|k| !k.is_empty()) else {
        warn!("skipping listing record without a key");
        return None;
    };
    if key.ends_with('/') {
        return None;
    }

    let size = match record.size.as_deref().map(|s| s.trim().parse::<u64>()) {
        Some(Ok(size)) => size,
        other => {
            warn!(%key, size = ?other, "skipping listing record with invalid size");
            return None;
        }
    };

    let modified = match record
        .last_modified
        .as_deref()
        .map(|s| DateTime::parse_from_rfc3339(s.trim()))
    {
        Some(Ok(modified)) => modified.with_timezone(&Utc),
        other => {
            warn!(%key, last_modified = ?other, "skipping listing record with invalid timestamp");
            return None;
        }
    };

    Some(ListedEntry::file(key, size, modified))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const TWO_ENTRY_LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>sermons</Name>
  <Prefix>youth/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>youth/intro.mp4</Key>
    <LastModified>2023-06-04T11:00:00.000Z</LastModified>
    <ETag>"9b2cf535f27731c974343645a3985328"</ETag>
    <Size>1048576</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <CommonPrefixes>
    <Prefix>youth/2023/</Prefix>
  </CommonPrefixes>
</ListBucketResult>"#;

    #[test]
    fn test_should_parse_directory_and_file() {
        let page = parse_listing(TWO_ENTRY_LISTING).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert!(!page.is_truncated);
        assert!(page.next_cursor.is_none());

        let dir = &page.entries[0];
        assert!(dir.is_directory);
        assert_eq!(dir.name, "2023");
        assert_eq!(dir.path, "youth/2023/");
        assert_eq!(dir.size, 0);

        let file = &page.entries[1];
        assert!(!file.is_directory);
        assert_eq!(file.name, "intro.mp4");
        assert_eq!(file.path, "youth/intro.mp4");
        assert_eq!(file.size, 1_048_576);
        assert_eq!(
            file.modified,
            Some(Utc.with_ymd_and_hms(2023, 6, 4, 11, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_should_skip_folder_marker_keys() {
        let xml = r"<ListBucketResult>
  <Contents><Key>youth/</Key><Size>0</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>youth/a.mp4</Key><Size>5</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].path, "youth/a.mp4");
    }

    #[test]
    fn test_should_skip_malformed_records() {
        let xml = r"<ListBucketResult>
  <Contents><Key>no-size.mp4</Key><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>bad-size.mp4</Key><Size>-3</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>bad-date.mp4</Key><Size>3</Size><LastModified>yesterday</LastModified></Contents>
  <Contents><Size>3</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>good.mp4</Key><Size>3</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].name, "good.mp4");
    }

    #[test]
    fn test_should_skip_record_with_duplicate_fields() {
        let xml = r"<ListBucketResult>
  <Contents><Key>a.mp4</Key><Key>b.mp4</Key><Size>3</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>c.mp4</Key><Size>3</Size><Size>4</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>good.mp4</Key><Size>3</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <CommonPrefixes><Prefix>x/</Prefix><Prefix>y/</Prefix></CommonPrefixes>
  <CommonPrefixes><Prefix>youth/</Prefix></CommonPrefixes>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        let paths: Vec<&str> = page.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["youth/", "good.mp4"]);
    }

    #[test]
    fn test_should_skip_record_with_nested_field_markup() {
        let xml = r"<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <Contents><Key>nested.mp4</Key><Size><x/></Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <Contents><Key>good.mp4</Key><Size>7</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <NextContinuationToken>abc</NextContinuationToken>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].path, "good.mp4");
        assert_eq!(page.entries[0].size, 7);
        assert!(page.is_truncated);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_should_tolerate_field_order_and_unicode_keys() {
        let xml = r"<ListBucketResult>
  <Contents><Size>42</Size><StorageClass>STANDARD</StorageClass><LastModified>2024-01-07T02:30:00+09:00</LastModified><Key>청년회/여름 수련회.mp4</Key></Contents>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        let file = &page.entries[0];
        assert_eq!(file.name, "여름 수련회.mp4");
        assert_eq!(file.size, 42);
        assert_eq!(
            file.modified,
            Some(Utc.with_ymd_and_hms(2024, 1, 6, 17, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_should_put_directories_before_files_in_document_order() {
        let xml = r"<ListBucketResult>
  <CommonPrefixes><Prefix>b/</Prefix></CommonPrefixes>
  <Contents><Key>z.mp4</Key><Size>1</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
  <CommonPrefixes><Prefix>a/</Prefix></CommonPrefixes>
  <Contents><Key>y.mp4</Key><Size>1</Size><LastModified>2023-06-04T11:00:00Z</LastModified></Contents>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        let paths: Vec<&str> = page.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["b/", "a/", "z.mp4", "y.mp4"]);
    }

    #[test]
    fn test_should_report_truncation_and_cursor() {
        let xml = r"<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=</NextContinuationToken>
</ListBucketResult>";
        let page = parse_listing(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(
            page.next_cursor.as_deref(),
            Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")
        );
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_should_surface_service_error_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist.</Message></Error>"#;
        match parse_listing(xml) {
            Err(XmlError::Service { code, message }) => {
                assert_eq!(code, "NoSuchBucket");
                assert_eq!(message, "The specified bucket does not exist.");
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_should_reject_non_listing_body() {
        assert!(matches!(
            parse_listing("upstream connect error"),
            Err(XmlError::UnexpectedDocument)
        ));
        assert!(matches!(
            parse_listing("<html><body>502</body></html>"),
            Err(XmlError::UnexpectedDocument)
        ));
    }

    #[test]
    fn test_should_reject_listing_element_below_another_root() {
        assert!(matches!(
            parse_listing("<Foo><ListBucketResult/></Foo>"),
            Err(XmlError::UnexpectedDocument)
        ));
        assert!(matches!(
            parse_listing("<Wrapper><Error><Code>X</Code></Error></Wrapper>"),
            Err(XmlError::UnexpectedDocument)
        ));
    }

    #[test]
    fn test_should_accept_namespaced_root_after_declaration() {
        let xml = r#"<?xml version="1.0"?>
<!-- listing -->
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        assert!(parse_listing(xml).unwrap().entries.is_empty());
    }

    #[test]
    fn test_should_parse_empty_listing() {
        let page = parse_listing("<ListBucketResult><KeyCount>0</KeyCount></ListBucketResult>")
            .unwrap();
        assert!(page.entries.is_empty());
        assert!(!page.is_truncated);
    }
}
