use std::io::Cursor;

use color_eyre::eyre::Result;
use modloc_core::ManifestFile;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// Bilingual language file: `<base><tags><tag language/></tags><strings>...</strings></base>`.
pub fn render_language_file(language_id: &str, strings: &[(String, String)]) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut base = BytesStart::new("base");
    base.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    base.push_attribute(("xmlns:xsd", "http://www.w3.org/2001/XMLSchema"));
    base.push_attribute(("type", "string"));
    w.write_event(Event::Start(base))?;

    w.write_event(Event::Start(BytesStart::new("tags")))?;
    let mut tag = BytesStart::new("tag");
    tag.push_attribute(("language", language_id));
    w.write_event(Event::Empty(tag))?;
    w.write_event(Event::End(BytesEnd::new("tags")))?;

    w.write_event(Event::Start(BytesStart::new("strings")))?;
    for (id, text) in strings {
        let mut s = BytesStart::new("string");
        s.push_attribute(("id", id.as_str()));
        s.push_attribute(("text", text.as_str()));
        w.write_event(Event::Empty(s))?;
    }
    w.write_event(Event::End(BytesEnd::new("strings")))?;
    w.write_event(Event::End(BytesEnd::new("base")))?;

    let mut bytes = w.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// `language_data.xml`. Base-language attributes are written only when `manifest.base` is set.
pub fn render_manifest(manifest: &ManifestFile) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("LanguageData");
    root.push_attribute(("id", manifest.language_id.as_str()));
    if let Some(base) = &manifest.base {
        root.push_attribute(("name", base.name.as_str()));
        if let Some(ext) = &base.subtitle_extension {
            root.push_attribute(("subtitle_extension", ext.as_str()));
        }
        let iso = base.supported_iso.join(",");
        if !iso.is_empty() {
            root.push_attribute(("supported_iso", iso.as_str()));
        }
        root.push_attribute(("under_development", "false"));
    }
    w.write_event(Event::Start(root))?;
    for f in &manifest.files {
        let mut lf = BytesStart::new("LanguageFile");
        lf.push_attribute(("xml_path", f.as_str()));
        w.write_event(Event::Empty(lf))?;
    }
    w.write_event(Event::End(BytesEnd::new("LanguageData")))?;

    let mut bytes = w.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}
