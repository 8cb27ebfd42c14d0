//! Minimal XMP sidecar parsing.
//!
//! Sidecars only contribute a handful of Dublin Core fields, so this is a
//! tolerant string scan over the XML rather than a full RDF parser. Values
//! wrapped in `rdf:Alt`/`rdf:Seq` lists resolve to their first `rdf:li`
//! entry.

use anyhow::{anyhow, Result};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpData {
    pub title: String,
    pub artist: String,
    pub description: String,
    pub copyright: String,
    pub notes: String,
}

pub fn parse(path: &Path) -> Result<XmpData> {
    let xml = std::fs::read_to_string(path)?;
    parse_str(&xml)
}

pub fn parse_str(xml: &str) -> Result<XmpData> {
    if !xml.contains("<x:xmpmeta") && !xml.contains("<rdf:RDF") {
        return Err(anyhow!("xmp: no rdf payload found"));
    }

    Ok(XmpData {
        title: tag_text(xml, "dc:title").unwrap_or_default(),
        artist: tag_text(xml, "dc:creator").unwrap_or_default(),
        description: tag_text(xml, "dc:description").unwrap_or_default(),
        copyright: tag_text(xml, "dc:rights").unwrap_or_default(),
        notes: tag_text(xml, "exif:UserComment").unwrap_or_default(),
    })
}

/// Inner text of the first occurrence of `tag`, resolving list containers
/// to their first item.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let start = xml.find(&open)?;
    let body_start = start + xml[start..].find('>')? + 1;
    let body_end = body_start + xml[body_start..].find(&close)?;
    let mut body = &xml[body_start..body_end];

    // Alt/Seq/Bag containers: take the first list item.
    if let Some(li_start) = body.find("<rdf:li") {
        let rest = &body[li_start..];
        let text_start = li_start + rest.find('>')? + 1;
        let text_end = text_start + body[text_start..].find("</rdf:li>")?;
        body = &body[text_start..text_end];
    }

    let text = unescape(body.trim());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDECAR: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description xmlns:dc="http://purl.org/dc/elements/1.1/">
   <dc:title>
    <rdf:Alt>
     <rdf:li xml:lang="x-default">Beach</rdf:li>
    </rdf:Alt>
   </dc:title>
   <dc:creator>
    <rdf:Seq>
     <rdf:li>Jane Doe</rdf:li>
    </rdf:Seq>
   </dc:creator>
   <dc:rights>
    <rdf:Alt>
     <rdf:li xml:lang="x-default">&#39;21 Jane &amp; Co</rdf:li>
    </rdf:Alt>
   </dc:rights>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    #[test]
    fn test_parse_sidecar() {
        let data = parse_str(SIDECAR).unwrap();
        assert_eq!(data.title, "Beach");
        assert_eq!(data.artist, "Jane Doe");
        assert_eq!(data.copyright, "'21 Jane & Co");
        assert_eq!(data.description, "");
        assert_eq!(data.notes, "");
    }

    #[test]
    fn test_plain_element_without_list() {
        let xml = r#"<rdf:RDF><dc:title>Plain</dc:title></rdf:RDF>"#;
        let data = parse_str(xml).unwrap();
        assert_eq!(data.title, "Plain");
    }

    #[test]
    fn test_not_xmp_is_an_error() {
        assert!(parse_str("<html></html>").is_err());
    }
}
