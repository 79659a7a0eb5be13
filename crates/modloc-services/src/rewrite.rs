//! Write canonical ids back into copies of content documents as `{=<id>}` markers.

use std::path::Path;

use color_eyre::eyre::Result;
use modloc_core::fs::slash_path;
use modloc_core::ids::{format_marker, split_marker};
use modloc_core::Catalog;
use modloc_domain::RewriteReport;
use modloc_parsers_xml::{
    content_documents, load_text, normalize_attribute_whitespace, normalize_line_endings,
    rule_for, template_target, xslt_rule_for, DocumentKind, ExtractionRule, XSL_NAMESPACE,
};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::{Reader, Writer};

use crate::util::PendingWrite;

/// Spans found and spans changed in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRewrite {
    pub text: String,
    pub spans: usize,
    pub changed: usize,
}

/// Id the span should carry, or `None` when the literal one is already right.
fn replacement(catalog: &Catalog, context: &str, raw: &str) -> Option<(bool, String)> {
    let (literal, text) = split_marker(raw);
    if text.is_empty() {
        return None;
    }
    let mut candidates = catalog
        .with_text(&text)
        .filter(|e| e.context == context)
        .peekable();
    let smallest = candidates.peek()?.id.clone();
    if candidates.any(|e| e.id == literal) {
        return Some((false, raw.to_string()));
    }
    Some((true, format_marker(&smallest, &text)))
}

/// Rewrite one decoded document. Bytes outside changed spans are passed through unchanged,
/// except a non-UTF-8 encoding declaration which is updated to match the output.
pub fn rewrite_document(
    text: &str,
    kind: DocumentKind,
    rules: &[ExtractionRule],
    catalog: &Catalog,
) -> Result<DocumentRewrite> {
    match kind {
        DocumentKind::Xml => rewrite_xml(text, rules, catalog),
        DocumentKind::Xslt => rewrite_xslt(text, rules, catalog),
    }
}

fn utf8_decl<'a>(d: BytesDecl<'a>) -> Result<BytesDecl<'a>> {
    let is_utf8 = match d.encoding() {
        None => true,
        Some(enc) => String::from_utf8_lossy(&enc?).eq_ignore_ascii_case("utf-8"),
    };
    if is_utf8 {
        return Ok(d);
    }
    let version = String::from_utf8_lossy(&d.version()?).into_owned();
    let standalone = match d.standalone() {
        Some(s) => Some(String::from_utf8_lossy(&s?).into_owned()),
        None => None,
    };
    Ok(BytesDecl::new(&version, Some("utf-8"), standalone.as_deref()).into_owned())
}

/// `Some((rebuilt, changed))` when at least one matched attribute changed.
fn rewrite_attributes(
    e: &BytesStart,
    rules: &[ExtractionRule],
    catalog: &Catalog,
    spans: &mut usize,
) -> Result<Option<(BytesStart<'static>, usize)>> {
    let element = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut values: Vec<(String, Option<String>)> = Vec::new();
    let mut changed_here = 0usize;
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let new_value = match rule_for(rules, &element, &local) {
            Some(rule) => {
                let escaped = std::str::from_utf8(&attr.value)?;
                let raw = unescape(&normalize_attribute_whitespace(escaped))?.into_owned();
                match replacement(catalog, &rule.context_for(&element), &raw) {
                    Some((changed, value)) => {
                        *spans += 1;
                        changed_here += usize::from(changed);
                        changed.then_some(value)
                    }
                    None => None,
                }
            }
            None => None,
        };
        values.push((key, new_value));
    }
    if changed_here == 0 {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    for (attr, (key, new_value)) in e.attributes().zip(values) {
        let attr = attr?;
        match new_value {
            Some(v) => rebuilt.push_attribute(escaped_attribute(&key, &v)),
            None if attr.value.contains(&b'"') => {
                let v = attr.unescape_value()?;
                rebuilt.push_attribute(escaped_attribute(&key, &v));
            }
            None => rebuilt.push_attribute(attr),
        }
    }
    Ok(Some((rebuilt, changed_here)))
}

/// Double-quoted attribute with whitespace kept as character references, so a reparse sees the
/// same value.
fn escaped_attribute<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    let escaped = escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    Attribute {
        key: QName(key.as_bytes()),
        value: escaped.into_bytes().into(),
    }
}

fn finish(writer: Writer<Vec<u8>>, spans: usize, changed: usize) -> Result<DocumentRewrite> {
    Ok(DocumentRewrite {
        text: String::from_utf8(writer.into_inner())?,
        spans,
        changed,
    })
}

fn rewrite_xml(text: &str, rules: &[ExtractionRule], catalog: &Catalog) -> Result<DocumentRewrite> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let (mut spans, mut changed) = (0usize, 0usize);

    loop {
        match reader.read_event()? {
            Event::Start(e) => match rewrite_attributes(&e, rules, catalog, &mut spans)? {
                Some((new, n)) => {
                    changed += n;
                    writer.write_event(Event::Start(new))?;
                }
                None => writer.write_event(Event::Start(e))?,
            },
            Event::Empty(e) => match rewrite_attributes(&e, rules, catalog, &mut spans)? {
                Some((new, n)) => {
                    changed += n;
                    writer.write_event(Event::Empty(new))?;
                }
                None => writer.write_event(Event::Empty(e))?,
            },
            Event::Decl(d) => writer.write_event(Event::Decl(utf8_decl(d)?))?,
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    finish(writer, spans, changed)
}

enum Frame {
    Template(String),
    Other,
}

/// Body of an `xsl:attribute` claimed by a rule, held back until its end tag so text split
/// across CDATA sections or comments is compared as one string.
struct PendingAttribute {
    context: String,
    depth: usize,
    /// Buffered events; `true` marks direct character data of the attribute.
    events: Vec<(bool, Event<'static>)>,
    text: String,
}

impl PendingAttribute {
    fn new(context: String) -> Self {
        Self {
            context,
            depth: 0,
            events: Vec::new(),
            text: String::new(),
        }
    }

    /// Write the body back, replacing its character data when the id changes.
    fn flush(
        self,
        catalog: &Catalog,
        writer: &mut Writer<Vec<u8>>,
        spans: &mut usize,
        changed: &mut usize,
    ) -> Result<()> {
        let body = self.text.trim();
        let replaced = if body.is_empty() {
            None
        } else {
            match replacement(catalog, &self.context, body) {
                Some((true, value)) => {
                    *spans += 1;
                    *changed += 1;
                    let lead = &self.text[..self.text.len() - self.text.trim_start().len()];
                    let trail = &self.text[self.text.trim_end().len()..];
                    Some(format!("{lead}{value}{trail}"))
                }
                Some((false, _)) => {
                    *spans += 1;
                    None
                }
                None => None,
            }
        };
        let Some(replaced) = replaced else {
            for (_, event) in self.events {
                writer.write_event(event)?;
            }
            return Ok(());
        };
        let mut pending_text = Some(replaced);
        for (direct, event) in self.events {
            if !direct {
                writer.write_event(event)?;
            } else if let Some(t) = pending_text.take() {
                writer.write_event(Event::Text(BytesText::new(&t)))?;
            }
        }
        Ok(())
    }
}

fn xsl_attribute_context(
    e: &BytesStart,
    frames: &[Frame],
    rules: &[ExtractionRule],
) -> Result<Option<String>> {
    let Some(name) = e.try_get_attribute("name")? else {
        return Ok(None);
    };
    let name = name.unescape_value()?;
    let Some(match_expr) = frames.iter().rev().find_map(|f| match f {
        Frame::Template(m) => Some(m.as_str()),
        _ => None,
    }) else {
        return Ok(None);
    };
    let context = xslt_rule_for(rules, match_expr, &name)
        .map(|rule| rule.context_for(&template_target(match_expr).element));
    Ok(context)
}

fn rewrite_xslt(text: &str, rules: &[ExtractionRule], catalog: &Catalog) -> Result<DocumentRewrite> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut frames: Vec<Frame> = Vec::new();
    let mut pending: Option<PendingAttribute> = None;
    let (mut spans, mut changed) = (0usize, 0usize);

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        if let Some(p) = pending.as_mut() {
            match event {
                Event::End(e) if p.depth == 0 => {
                    if let Some(p) = pending.take() {
                        p.flush(catalog, &mut writer, &mut spans, &mut changed)?;
                    }
                    writer.write_event(Event::End(e))?;
                }
                Event::Start(e) => {
                    p.depth += 1;
                    p.events.push((false, Event::Start(e.into_owned())));
                }
                Event::End(e) => {
                    p.depth -= 1;
                    p.events.push((false, Event::End(e.into_owned())));
                }
                Event::Text(t) if p.depth == 0 => {
                    p.text.push_str(&normalize_line_endings(&t.unescape()?));
                    p.events.push((true, Event::Text(t.into_owned())));
                }
                Event::CData(c) if p.depth == 0 => {
                    p.text
                        .push_str(&normalize_line_endings(&String::from_utf8_lossy(&c)));
                    p.events.push((true, Event::CData(c.into_owned())));
                }
                Event::Eof => {
                    if let Some(p) = pending.take() {
                        p.flush(catalog, &mut writer, &mut spans, &mut changed)?;
                    }
                    break;
                }
                other => p.events.push((false, other.into_owned())),
            }
            continue;
        }

        let is_xsl = matches!(ns, ResolveResult::Bound(n) if n.as_ref() == XSL_NAMESPACE.as_bytes());
        match event {
            Event::Start(e) => {
                let local = e.local_name();
                match (is_xsl, local.as_ref()) {
                    (true, b"template") => match e.try_get_attribute("match")? {
                        Some(m) => frames.push(Frame::Template(m.unescape_value()?.into_owned())),
                        None => frames.push(Frame::Other),
                    },
                    // the claimed attribute never gets a frame; its end tag closes `pending`
                    (true, b"attribute") => match xsl_attribute_context(&e, &frames, rules)? {
                        Some(context) => pending = Some(PendingAttribute::new(context)),
                        None => frames.push(Frame::Other),
                    },
                    _ => frames.push(Frame::Other),
                }
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                frames.pop();
                writer.write_event(Event::End(e))?;
            }
            Event::Decl(d) => writer.write_event(Event::Decl(utf8_decl(d)?))?,
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    finish(writer, spans, changed)
}

/// Rewrite every content document of `module_data` into `out_module_data`. Only documents with
/// at least one changed span are returned; unreadable ones are skipped.
pub fn plan_rewrites(
    module_data: &Path,
    out_module_data: &Path,
    rules: &[ExtractionRule],
    catalog: &Catalog,
) -> (Vec<PendingWrite>, RewriteReport) {
    let mut writes = Vec::new();
    let mut report = RewriteReport::default();
    for (path, kind) in content_documents(module_data) {
        let Ok(rel) = path.strip_prefix(module_data) else {
            continue;
        };
        let rel_s = slash_path(rel);
        let text = match load_text(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(event = "rewrite_skipped", path = %rel_s, error = %e);
                continue;
            }
        };
        let doc = match rewrite_document(&text, kind, rules, catalog) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(event = "rewrite_skipped", path = %rel_s, error = %e);
                continue;
            }
        };
        report.files_checked += 1;
        report.entries_total += doc.spans;
        if doc.changed == 0 {
            continue;
        }
        report.files_changed += 1;
        report.entries_changed += doc.changed;
        report.files.push(rel_s);
        writes.push(PendingWrite::new(out_module_data.join(rel), doc.text.into_bytes()));
    }
    tracing::info!(
        event = "rewrite_planned",
        files = report.files_changed,
        changed = report.entries_changed,
        total = report.entries_total
    );
    (writes, report)
}
