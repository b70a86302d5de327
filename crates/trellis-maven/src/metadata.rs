//! `maven-metadata.xml` reading for version listing.

use quick_xml::events::Event;
use quick_xml::Reader;
use trellis_util::errors::{TrellisError, TrellisResult};

/// Module-level metadata listing published versions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

pub fn parse_metadata(xml: &str) -> TrellisResult<MavenMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TrellisError::parse(format!("Malformed maven-metadata.xml: {e}")))?;
        match event {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                text.clear();
            }
            Event::Text(e) => {
                text = e
                    .unescape()
                    .map_err(|e| TrellisError::parse(format!("Malformed metadata text: {e}")))?
                    .into_owned();
            }
            Event::End(_) => {
                match path.join(">").as_str() {
                    "metadata>groupId" => meta.group_id = Some(text.clone()),
                    "metadata>artifactId" => meta.artifact_id = Some(text.clone()),
                    "metadata>versioning>latest" => meta.latest = Some(text.clone()),
                    "metadata>versioning>release" => meta.release = Some(text.clone()),
                    "metadata>versioning>versions>version" => meta.versions.push(text.clone()),
                    _ => {}
                }
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_versions_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.acme</groupId>
  <artifactId>acme-core</artifactId>
  <versioning>
    <latest>2.0-SNAPSHOT</latest>
    <release>1.5</release>
    <versions>
      <version>1.0</version>
      <version>1.5</version>
      <version>2.0-SNAPSHOT</version>
    </versions>
    <lastUpdated>20240101120000</lastUpdated>
  </versioning>
</metadata>"#;
        let meta = parse_metadata(xml).unwrap();
        assert_eq!(meta.artifact_id.as_deref(), Some("acme-core"));
        assert_eq!(meta.release.as_deref(), Some("1.5"));
        assert_eq!(meta.versions, ["1.0", "1.5", "2.0-SNAPSHOT"]);
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(parse_metadata("<metadata><versioning></metadata>").is_err());
    }
}
