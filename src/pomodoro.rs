//! Pomodoro session annotations embedded in block text.
//!
//! A block carries at most one annotation. In markdown it looks like
//! `>[🍅🍅 50min](#agenda-pomo://?t=f-1000-1500,p-2600-300-call)` and in org
//! like `>[[#agenda-pomo://?t=f-1000-1500][🍅 25min]]`. The `t` parameter is a
//! comma separated list of `type-start-length[-remark]` records where `type`
//! is `f` for a full session and `p` for a partial one.

use std::fmt;
use std::ops::Range;

use anyhow::{bail, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

pub const SCHEME: &str = "agenda-pomo://";
const PARAM: &str = "t";
const TOMATO: &str = "🍅";

/// Characters left as-is by `application/x-www-form-urlencoded`.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Text dialect of the block holding the annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Org,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "markdown" | "md" => Ok(Self::Markdown),
            "org" => Ok(Self::Org),
            _ => bail!("invalid format '{s}': must be markdown or org"),
        }
    }

    /// Dialect of a host block. Blocks without a format are markdown; any
    /// format other than markdown is read with the org syntax.
    pub fn of_block(format: Option<&str>) -> Self {
        match format {
            None | Some("markdown") => Self::Markdown,
            Some(_) => Self::Org,
        }
    }
}

/// One timer session. `start` and `length` are `None` when the stored text
/// was not a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub is_full: bool,
    pub start: Option<i64>,
    pub length: Option<i64>,
    pub interruption_remark: Option<String>,
}

impl SessionRecord {
    pub fn full(start: i64, length: i64) -> Self {
        Self {
            is_full: true,
            start: Some(start),
            length: Some(length),
            interruption_remark: None,
        }
    }

    pub fn partial(start: i64, length: i64, remark: Option<String>) -> Self {
        Self {
            is_full: false,
            start: Some(start),
            length: Some(length),
            interruption_remark: remark.filter(|r| !r.is_empty()),
        }
    }

    fn tokenize(raw: &str) -> Self {
        let mut parts = raw.splitn(4, '-');
        let kind = parts.next().unwrap_or_default();
        let start = parts.next().and_then(parse_int);
        let length = parts.next().and_then(parse_int);
        let interruption_remark = parts.next().filter(|r| !r.is_empty()).map(str::to_string);
        Self {
            is_full: kind == "f",
            start,
            length,
            interruption_remark,
        }
    }
}

struct Num(Option<i64>);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("NaN"),
        }
    }
}

impl fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_full { 'f' } else { 'p' };
        write!(f, "{kind}-{}-{}", Num(self.start), Num(self.length))?;
        if let Some(remark) = &self.interruption_remark {
            write!(f, "-{remark}")?;
        }
        Ok(())
    }
}

/// Integer-prefix parse: leading whitespace and a sign are accepted, trailing
/// garbage is ignored, and text without leading digits is not a number.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Location of an annotation in a text body and the URL it carries.
struct Annotation<'a> {
    span: Range<usize>,
    url: &'a str,
}

fn find(text: &str, format: Format) -> Option<Annotation<'_>> {
    let opener = match format {
        Format::Markdown => ">[",
        Format::Org => ">[[#",
    };
    let mut from = 0;
    while let Some(pos) = text[from..].find(opener) {
        let start = from + pos;
        let body = start + opener.len();
        let found = match format {
            Format::Markdown => scan_markdown(text, body),
            Format::Org => scan_org(text, body),
        };
        if let Some((url, end)) = found {
            return Some(Annotation {
                span: start..end,
                url,
            });
        }
        from = body;
    }
    None
}

/// `LABEL](#URL)` starting at `at`; returns the URL and the end offset.
fn scan_markdown(text: &str, at: usize) -> Option<(&str, usize)> {
    let rest = &text[at..];
    let label_end = rest.find("](#")?;
    if rest[..label_end].contains(&['\n', '[', ']'][..]) {
        return None;
    }
    let url_start = at + label_end + 3;
    let url_len = text[url_start..].find(')')?;
    let url = &text[url_start..url_start + url_len];
    valid_url(url).then_some((url, url_start + url_len + 1))
}

/// `URL][LABEL]]` starting at `at`; returns the URL and the end offset.
fn scan_org(text: &str, at: usize) -> Option<(&str, usize)> {
    let rest = &text[at..];
    let url_len = rest.find("][")?;
    let url = &rest[..url_len];
    if !valid_url(url) {
        return None;
    }
    let label_start = at + url_len + 2;
    let label_len = text[label_start..].find("]]")?;
    if text[label_start..label_start + label_len].contains(&['\n', '['][..]) {
        return None;
    }
    Some((url, label_start + label_len + 2))
}

fn valid_url(url: &str) -> bool {
    url.starts_with(SCHEME) && !url.contains(char::is_whitespace)
}

/// Value of the `t` query parameter, decoded. Empty values count as absent.
fn payload(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == PARAM)
        .map(|(_, value)| form_decode(value))
        .filter(|value| !value.is_empty())
}

fn form_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_VALUE)
        .to_string()
        .replace("%20", "+")
}

/// Sessions recorded in `text`, or `None` when it carries no annotation.
pub fn parse(text: &str, format: Format) -> Option<Vec<SessionRecord>> {
    let annotation = find(text, format)?;
    let payload = payload(annotation.url)?;
    Some(payload.split(',').map(SessionRecord::tokenize).collect())
}

/// Sum of all session lengths; not a number if any length is.
pub fn total_seconds(records: &[SessionRecord]) -> Option<i64> {
    records
        .iter()
        .try_fold(0i64, |acc, r| r.length.map(|len| acc.saturating_add(len)))
}

/// Display label: one tomato per full session (at least one) and the total
/// duration in minutes.
pub fn label(records: &[SessionRecord]) -> String {
    let full = records.iter().filter(|r| r.is_full).count();
    let tomatoes = TOMATO.repeat(full.max(1));
    let minutes = match total_seconds(records) {
        Some(secs) => (secs as f64 / 60.0).to_string(),
        None => "NaN".to_string(),
    };
    format!("{tomatoes} {minutes}min")
}

/// The annotation text for `records` in the given dialect.
pub fn encode(records: &[SessionRecord], format: Format) -> String {
    let payload = records
        .iter()
        .map(SessionRecord::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let url = format!("{SCHEME}?{PARAM}={}", form_encode(&payload));
    let label = label(records);
    match format {
        Format::Markdown => format!(">[{label}](#{url})"),
        Format::Org => format!(">[[#{url}][{label}]]"),
    }
}

/// `text` with `record` added to its sessions. An existing annotation is
/// rewritten in place; otherwise the annotation is appended after a space.
pub fn append(text: &str, format: Format, record: SessionRecord) -> String {
    let mut records = parse(text, format).unwrap_or_default();
    records.push(record);
    let annotation = encode(&records, format);
    match find(text, format) {
        Some(existing) => format!(
            "{}{}{}",
            &text[..existing.span.start],
            annotation,
            &text[existing.span.end..]
        ),
        None => format!("{text} {annotation}"),
    }
}

/// `text` without its annotation, trimmed.
pub fn remove(text: &str, format: Format) -> String {
    match find(text, format) {
        Some(existing) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..existing.span.start]);
            out.push_str(&text[existing.span.end..]);
            out.trim().to_string()
        }
        None => text.trim().to_string(),
    }
}

/// `MM:SS` within the current hour.
pub fn seconds_to_time(seconds: i64) -> String {
    let minute = (seconds % 3600) / 60;
    let second = seconds % 60;
    format!("{minute:02}:{second:02}")
}
