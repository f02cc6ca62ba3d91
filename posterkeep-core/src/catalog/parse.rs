//! Library listing XML.

use std::path::PathBuf;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// The attributes of one `<Video>` element that poster sync cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct VideoEntry {
    pub title: Option<String>,
    /// Server-side item id.
    pub rating_key: Option<String>,
    /// Poster path relative to the server.
    pub thumb: Option<String>,
    /// `file` of the first `Media/Part`.
    pub media_file: Option<PathBuf>,
}

/// Collect every `<Video>` element of a library listing, at any depth.
pub fn parse_library_listing(
    xml: &[u8],
) -> Result<Vec<VideoEntry>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<VideoEntry> = None;
    let mut media_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Video" => {
                    current = Some(video_entry(&e));
                    media_depth = 0;
                }
                b"Media" if current.is_some() => media_depth += 1,
                b"Part" => record_part(&e, current.as_mut(), media_depth),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"Video" => entries.push(video_entry(&e)),
                b"Part" => record_part(&e, current.as_mut(), media_depth),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"Video" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                b"Media" => media_depth = media_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn video_entry(e: &BytesStart<'_>) -> VideoEntry {
    VideoEntry {
        title: attribute(e, b"title"),
        rating_key: attribute(e, b"ratingKey"),
        thumb: attribute(e, b"thumb"),
        media_file: None,
    }
}

fn record_part(
    e: &BytesStart<'_>,
    current: Option<&mut VideoEntry>,
    media_depth: usize,
) {
    let Some(entry) = current else {
        return;
    };
    if media_depth == 0 || entry.media_file.is_some() {
        return;
    }
    entry.media_file = attribute(e, b"file").map(PathBuf::from);
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}
