//! RSS 2.0 and Atom parsing.
//!
//! Only the fields the pipeline needs are read: title, link, description or
//! summary, publication date and source name. HTML inside descriptions is
//! reduced to its text.

use crate::config::FeedSource;
use crate::errors::FetchError;
use crate::models::RawArticle;
use crate::utils::domain_of;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use scraper::Html;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Content,
    Published,
    Updated,
    Source,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" | b"summary" => Some(Field::Description),
            b"encoded" | b"content" => Some(Field::Content),
            b"pubDate" | b"published" | b"date" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            b"source" => Some(Field::Source),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    title: String,
    link: String,
    description: String,
    content: String,
    published: String,
    updated: String,
    source: String,
}

impl Entry {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Source => &mut self.source,
        };
        if slot.is_empty() {
            *slot = value.trim().to_string();
        }
    }

    fn into_raw(self, feed: &FeedSource) -> Option<RawArticle> {
        if self.title.is_empty() && self.link.is_empty() && self.description.is_empty() {
            return None;
        }
        let body = if self.description.is_empty() {
            self.content
        } else {
            self.description
        };
        let source = if self.source.is_empty() {
            domain_of(&self.link)
                .or_else(|| domain_of(&feed.url))
                .unwrap_or_else(|| feed.url.clone())
        } else {
            self.source
        };
        let published_at = parse_date(&self.published).or_else(|| parse_date(&self.updated));
        Some(RawArticle {
            title: strip_html(&self.title),
            link: self.link,
            summary_text: strip_html(&body),
            published_at,
            source,
            origin_category: Some(feed.category.clone()),
        })
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, Dublin Core) timestamps.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return fragment.to_string();
    }
    let doc = Html::parse_fragment(fragment);
    let text: String = doc.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn alternate_href(e: &BytesStart) -> Option<String> {
    let mut href = None;
    let mut alternate = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => {
                let raw = String::from_utf8_lossy(&attr.value);
                href = Some(unescape(&raw).map_or_else(|_| raw.to_string(), |v| v.into_owned()));
            }
            b"rel" => alternate = attr.value.as_ref() == b"alternate",
            _ => {}
        }
    }
    href.filter(|_| alternate)
}

/// Parse one feed document into raw articles tagged with the feed's category.
#[instrument(level = "debug", skip(xml), fields(url = %feed.url))]
pub fn parse_feed(xml: &str, feed: &FeedSource) -> Result<Vec<RawArticle>, FetchError> {
    // untrimmed: entity references split text events
    let mut reader = Reader::from_str(xml);

    let mut recognized = false;
    let mut articles = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut field: Option<(Field, Vec<u8>)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                match name {
                    b"rss" | b"RDF" | b"feed" => recognized = true,
                    b"item" | b"entry" => entry = Some(Entry::default()),
                    _ if entry.is_some() && field.is_none() => {
                        if let Some(f) = Field::from_local_name(name) {
                            if f == Field::Link {
                                if let (Some(href), Some(current)) = (alternate_href(&e), entry.as_mut()) {
                                    current.set(Field::Link, href);
                                }
                            }
                            field = Some((f, name.to_vec()));
                            text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(href), Some(current)) = (alternate_href(&e), entry.as_mut()) {
                        current.set(Field::Link, href);
                    }
                }
            }
            Event::Text(e) if field.is_some() => {
                let raw = String::from_utf8_lossy(&e);
                match unescape(&raw) {
                    Ok(s) => text.push_str(&s),
                    Err(_) => text.push_str(&raw),
                }
            }
            Event::CData(e) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) if field.is_some() => {
                let reference = format!("&{};", String::from_utf8_lossy(&e));
                match unescape(&reference) {
                    Ok(s) => text.push_str(&s),
                    Err(_) => text.push_str(&reference),
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if field.as_ref().is_some_and(|(_, open)| open.as_slice() == name) {
                    if let (Some((f, _)), Some(current)) = (field.take(), entry.as_mut()) {
                        current.set(f, std::mem::take(&mut text));
                    }
                } else if field.is_none() && matches!(name, b"item" | b"entry") {
                    if let Some(raw) = entry.take().and_then(|done| done.into_raw(feed)) {
                        articles.push(raw);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !recognized {
        return Err(FetchError::UnknownFormat);
    }
    debug!(count = articles.len(), "Parsed feed");
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed() -> FeedSource {
        FeedSource {
            url: "https://feeds.example.com/health.xml".to_string(),
            category: "health".to_string(),
        }
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Health</title>
    <link>https://www.example.com/</link>
    <item>
      <title>WHO declares new pandemic outbreak</title>
      <link>https://www.example.com/news/outbreak</link>
      <description><![CDATA[<p>Health officials are <b>tracking</b> the outbreak.</p>]]></description>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
      <source url="https://wire.example.org">Example Wire</source>
    </item>
    <item>
      <title>Markets &amp; banks rally</title>
      <link>https://news.example.org/markets</link>
      <description>Shares rose &lt;b&gt;sharply&lt;/b&gt;.</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <entry>
    <title>Troops deployed to border</title>
    <link rel="alternate" href="https://atom.example.com/troops"/>
    <link rel="enclosure" href="https://atom.example.com/troops.jpg"/>
    <summary>Defense officials confirmed the move.</summary>
    <published>2025-05-06T10:00:00Z</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let articles = parse_feed(RSS, &feed()).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "WHO declares new pandemic outbreak");
        assert_eq!(first.link, "https://www.example.com/news/outbreak");
        assert_eq!(first.summary_text, "Health officials are tracking the outbreak.");
        assert_eq!(first.source, "Example Wire");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap())
        );
        assert_eq!(first.origin_category.as_deref(), Some("health"));

        let second = &articles[1];
        assert_eq!(second.title, "Markets & banks rally");
        assert_eq!(second.summary_text, "Shares rose sharply.");
        assert_eq!(second.source, "news.example.org");
        assert_eq!(second.published_at, None);
    }

    #[test]
    fn test_parse_atom() {
        let articles = parse_feed(ATOM, &feed()).unwrap();
        assert_eq!(articles.len(), 1);
        let entry = &articles[0];
        assert_eq!(entry.title, "Troops deployed to border");
        assert_eq!(entry.link, "https://atom.example.com/troops");
        assert_eq!(entry.summary_text, "Defense officials confirmed the move.");
        assert_eq!(entry.source, "atom.example.com");
        assert_eq!(
            entry.published_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unknown_document() {
        let err = parse_feed("<html><body>nope</body></html>", &feed()).unwrap_err();
        assert!(matches!(err, FetchError::UnknownFormat));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(parse_feed("<rss><channel><item></channel></rss>", &feed()).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("Tue, 06 May 2025 14:30:00 +0200").is_some());
        assert!(parse_date("2025-05-06T10:00:00+00:00").is_some());
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>One <a href='x'>two</a></p>\n<p>three</p>"), "One two three");
        assert_eq!(strip_html("plain text"), "plain text");
        assert_eq!(strip_html("An <b>un</b>believable rise."), "An unbelievable rise.");
    }

    #[test]
    fn test_atom_href_entities_are_unescaped() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Rates held</title>
    <link rel="alternate" href="https://x.example.com/a?id=1&amp;b=2"/>
  </entry>
</feed>"#;
        let articles = parse_feed(xml, &feed()).unwrap();
        assert_eq!(articles[0].link, "https://x.example.com/a?id=1&b=2");
    }
}
