//! Extraction from `ModuleData` content documents.

use std::borrow::Cow;

use modloc_core::Entry;
use once_cell::sync::OnceCell;
use regex::Regex;
use roxmltree::{Document, Node};

use crate::rules::{rule_for, ExtractionRule};

pub const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Xml,
    Xslt,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("xml") {
            Some(Self::Xml)
        } else if ext.eq_ignore_ascii_case("xslt") || ext.eq_ignore_ascii_case("xsl") {
            Some(Self::Xslt)
        } else {
            None
        }
    }
}

pub fn extract(doc: &Document, kind: DocumentKind, file: &str, rules: &[ExtractionRule]) -> Vec<Entry> {
    match kind {
        DocumentKind::Xml => extract_xml(doc, file, rules),
        DocumentKind::Xslt => extract_xslt(doc, file, rules),
    }
}

fn extract_xml(doc: &Document, file: &str, rules: &[ExtractionRule]) -> Vec<Entry> {
    let mut out = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let element = node.tag_name().name();
        for attr in node.attributes() {
            let Some(rule) = rule_for(rules, element, attr.name()) else {
                continue;
            };
            let mut e = Entry::candidate(attr.value(), rule.context_for(element), attr.name(), file);
            if e.text_source.is_empty() {
                continue;
            }
            e.object_id = node.attribute("id").map(str::to_string);
            out.push(e);
        }
    }
    out
}

fn extract_xslt(doc: &Document, file: &str, rules: &[ExtractionRule]) -> Vec<Entry> {
    let mut out = Vec::new();
    for node in doc.descendants().filter(|n| is_xsl(n, "attribute")) {
        let Some(attribute) = node.attribute("name") else {
            continue;
        };
        let Some(match_expr) = node
            .ancestors()
            .find(|a| is_xsl(a, "template"))
            .and_then(|t| t.attribute("match"))
        else {
            continue;
        };
        let Some(rule) = xslt_rule_for(rules, match_expr, attribute) else {
            continue;
        };
        let target = template_target(match_expr);
        let raw = xsl_text(&node);
        let mut e = Entry::candidate(raw.trim(), rule.context_for(&target.element), attribute, file);
        if e.text_source.is_empty() {
            continue;
        }
        e.object_id = target.object_id;
        out.push(e);
    }
    out
}

/// Attribute-value normalization of a raw (still escaped) value: every literal `\r\n`, `\r`,
/// `\n` or `\t` becomes one space. Character references are left for the unescaper, so
/// `&#10;` still yields a newline. This is what the parser hands the extractor.
pub fn normalize_attribute_whitespace(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\t' | '\n' | '\r' => out.push(' '),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// `\r\n` and lone `\r` to `\n`, as the parser does for character data.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

fn is_xsl(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(XSL_NAMESPACE)
}

fn xsl_text(node: &Node) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

/// Rule for an `xsl:attribute name=<attribute>` inside a template matching `match_expr`.
pub fn xslt_rule_for<'a>(
    rules: &'a [ExtractionRule],
    match_expr: &str,
    attribute: &str,
) -> Option<&'a ExtractionRule> {
    rules.iter().find(|r| {
        let needle = r.template_needle();
        r.attribute == attribute && (needle == "*" || match_expr.contains(needle))
    })
}

/// Element addressed by an XSLT `match` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTarget {
    pub element: String,
    pub object_id: Option<String>,
}

fn id_predicate_re() -> &'static Regex {
    static ID_PRED: OnceCell<Regex> = OnceCell::new();
    ID_PRED.get_or_init(|| Regex::new(r#"@id\s*=\s*['"]([^'"]*)['"]"#).unwrap())
}

/// Last element step of the first alternative of `match_expr`, without predicate or prefix.
pub fn template_target(match_expr: &str) -> TemplateTarget {
    let first = match_expr.split('|').next().unwrap_or("").trim();
    let step = split_steps(first)
        .into_iter()
        .rev()
        .find(|s| !s.is_empty() && !s.starts_with('@'))
        .unwrap_or_default();
    let name_part = step.split('[').next().unwrap_or("");
    let element = name_part
        .rsplit(':')
        .next()
        .unwrap_or(name_part)
        .trim()
        .to_string();
    let object_id = id_predicate_re()
        .captures(&step)
        .map(|c| c[1].to_string());
    TemplateTarget { element, object_id }
}

/// Split on `/` outside of `[...]` predicates.
fn split_steps(expr: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    for ch in expr.chars() {
        match ch {
            '[' => {
                depth += 1;
                cur.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                cur.push(ch);
            }
            '/' if depth == 0 => steps.push(std::mem::take(&mut cur)),
            _ => cur.push(ch),
        }
    }
    steps.push(cur);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_rules;

    #[test]
    fn xml_extracts_name_and_text_with_markers() {
        let doc = Document::parse(
            r#"<NPCCharacters>
                 <NPCCharacter id="npc_1" name="{=npc_name_1}Guard" />
                 <NPCCharacter id="npc_2" name="Villager" age="20" />
                 <Item id="i1" name="{=!}Sword" text="" />
               </NPCCharacters>"#,
        )
        .unwrap();
        let es = extract(&doc, DocumentKind::Xml, "npcs.xml", &default_rules());
        assert_eq!(es.len(), 3);
        assert_eq!(es[0].id, "npc_name_1");
        assert_eq!(es[0].context, "NPCCharacter.name");
        assert_eq!(es[0].object_id.as_deref(), Some("npc_1"));
        assert_eq!(es[1].id, "");
        assert_eq!(es[1].text_source, "Villager");
        assert_eq!(es[2].id, "!");
        assert_eq!(es[2].context, "Item.name");
    }

    #[test]
    fn xslt_reads_attribute_templates() {
        let doc = Document::parse(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
                 <xsl:template match="Settlement[@id='town_A1']/@name">
                   <xsl:attribute name="name">{=town_a1}Marunath</xsl:attribute>
                 </xsl:template>
                 <xsl:template match="Kingdom[@id='k1']">
                   <xsl:copy>
                     <xsl:attribute name="text">
                       The northern realm
                     </xsl:attribute>
                     <xsl:attribute name="banner_key">11.22</xsl:attribute>
                   </xsl:copy>
                 </xsl:template>
               </xsl:stylesheet>"#,
        )
        .unwrap();
        let es = extract(&doc, DocumentKind::Xslt, "patch.xslt", &default_rules());
        assert_eq!(es.len(), 2);
        assert_eq!(es[0].id, "town_a1");
        assert_eq!(es[0].context, "Settlement.name");
        assert_eq!(es[0].object_id.as_deref(), Some("town_A1"));
        assert_eq!(es[1].text_source, "The northern realm");
        assert_eq!(es[1].context, "Kingdom.text");
    }

    #[test]
    fn attribute_whitespace_matches_parser() {
        let src = "<R a=\"one\r\ntwo\tthree\nfour\" b=\"keep&#10;ref\"/>";
        let doc = Document::parse(src).unwrap();
        let node = doc.root_element();
        assert_eq!(
            normalize_attribute_whitespace("one\r\ntwo\tthree\nfour"),
            node.attribute("a").unwrap()
        );
        assert_eq!(normalize_attribute_whitespace("keep&#10;ref"), "keep&#10;ref");
        assert_eq!(node.attribute("b"), Some("keep\nref"));
        assert!(matches!(normalize_attribute_whitespace("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn xslt_text_joins_cdata_segments() {
        let doc = Document::parse(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
                 <xsl:template match="Item[@id='i']">
                   <xsl:attribute name="name">Salt <![CDATA[& Pepper]]> mix</xsl:attribute>
                 </xsl:template>
               </xsl:stylesheet>"#,
        )
        .unwrap();
        let es = extract(&doc, DocumentKind::Xslt, "p.xslt", &default_rules());
        assert_eq!(es[0].text_source, "Salt & Pepper mix");
    }

    #[test]
    fn template_target_ignores_slashes_in_predicates() {
        let t = template_target("Items/Item[@id='a/b']/@name | Other");
        assert_eq!(t.element, "Item");
        assert_eq!(t.object_id.as_deref(), Some("a/b"));
    }

    #[test]
    fn specific_xslt_rule_needs_selector_in_match() {
        let rules = vec![ExtractionRule::new("Hero", "Hero.text", "text")];
        assert!(xslt_rule_for(&rules, "Hero[@id='h']", "text").is_some());
        assert!(xslt_rule_for(&rules, "Clan[@id='c']", "text").is_none());
    }
}
