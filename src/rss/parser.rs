//! RSS document parsing and item normalization.
//!
//! The parser walks the XML with `quick-xml`, keeping the stack of open
//! element names. Only `channel/{title,link,description}` and
//! `channel/item/{title,link,description,pubDate}` below the root are
//! captured; the root element name itself is not checked.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use uuid::Uuid;

use super::types::{NewPost, RawChannel, RawFeedDocument, RawItem};
use crate::datetime::parse_pub_date;
use crate::{GatorError, Result};

/// Parse raw feed bytes into a [`RawFeedDocument`].
///
/// Fails with [`GatorError::Parse`] when the input is not well-formed:
/// no root element, mismatched or unclosed tags, stray text outside the
/// root, or invalid entity references.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeedDocument> {
    let mut reader = Reader::from_reader(bytes);

    let mut doc = RawFeedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open_element(&stack, &mut seen_root, &name)?;
                stack.push(name);
                if is_item_path(&stack) {
                    doc.items.push(RawItem::default());
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open_element(&stack, &mut seen_root, &name)?;
                stack.push(name);
                if is_item_path(&stack) {
                    doc.items.push(RawItem::default());
                }
                stack.pop();
            }
            Ok(Event::End(_)) => {
                // quick-xml already rejects end tags that do not match
                if let Some(field) = field_at(&mut doc, &stack) {
                    trim_in_place(field);
                }
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| parse_error(&reader, err))?
                    .into_owned();
                append_text(&mut doc, &stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|err| parse_error(&reader, err))?
                    .to_string();
                append_text(&mut doc, &stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(parse_error(&reader, err)),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(GatorError::Parse("document has no root element".into()));
    }
    if let Some(open) = stack.last() {
        return Err(GatorError::Parse(format!(
            "unexpected end of document: <{open}> is not closed"
        )));
    }

    doc.channel.title = unescape_html(&doc.channel.title);
    doc.channel.description = unescape_html(&doc.channel.description);

    Ok(doc)
}

fn parse_error(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> GatorError {
    GatorError::Parse(format!("at byte {}: {err}", reader.buffer_position()))
}

fn open_element(stack: &[String], seen_root: &mut bool, name: &str) -> Result<()> {
    if stack.is_empty() {
        if *seen_root {
            return Err(GatorError::Parse(format!(
                "multiple root elements (found <{name}> after the first)"
            )));
        }
        *seen_root = true;
    }
    Ok(())
}

fn is_item_path(stack: &[String]) -> bool {
    stack.len() == 3 && stack[1] == "channel" && stack[2] == "item"
}

fn append_text(doc: &mut RawFeedDocument, stack: &[String], text: &str) -> Result<()> {
    if stack.is_empty() {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(GatorError::Parse("text outside of the root element".into()));
    }

    if let Some(field) = field_at(doc, stack) {
        field.push_str(text);
    }
    Ok(())
}

/// The captured field for the innermost open element, if any.
fn field_at<'a>(doc: &'a mut RawFeedDocument, stack: &[String]) -> Option<&'a mut String> {
    let path: Vec<&str> = stack.iter().skip(1).map(String::as_str).collect();
    match path.as_slice() {
        ["channel", field] => channel_field(&mut doc.channel, field),
        ["channel", "item", field] => item_field(doc.items.last_mut()?, field),
        _ => None,
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn channel_field<'a>(channel: &'a mut RawChannel, name: &str) -> Option<&'a mut String> {
    match name {
        "title" => Some(&mut channel.title),
        "link" => Some(&mut channel.link),
        "description" => Some(&mut channel.description),
        _ => None,
    }
}

fn item_field<'a>(item: &'a mut RawItem, name: &str) -> Option<&'a mut String> {
    match name {
        "title" => Some(&mut item.title),
        "link" => Some(&mut item.link),
        "description" => Some(&mut item.description),
        "pubDate" => Some(&mut item.pub_date),
        _ => None,
    }
}

/// Decode HTML character references once.
pub fn unescape_html(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// Turn a raw item into a post for `feed_id`.
///
/// Title and description are HTML-unescaped; an empty description becomes
/// `None`. Fails with [`GatorError::Validation`] when the item has no link
/// and [`GatorError::DateFormat`] when `pubDate` does not parse.
pub fn normalize_item(feed_id: Uuid, item: &RawItem, now: DateTime<Utc>) -> Result<NewPost> {
    let url = item.link.trim();
    if url.is_empty() {
        return Err(GatorError::Validation("item has no link".into()));
    }

    let published_at = parse_pub_date(&item.pub_date)?;
    let description = unescape_html(&item.description);

    Ok(NewPost {
        feed_id,
        title: unescape_html(&item.title),
        url: url.to_string(),
        description: if description.trim().is_empty() {
            None
        } else {
            Some(description)
        },
        published_at,
        created_at: now,
    })
}
