use serde::Deserialize;

use crate::error::{Error, Result};

/// File name of a skill's manifest.
pub const MANIFEST_FILE: &str = "SKILL.md";

/// The frontmatter fields the installer cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestHeader {
    #[serde(default)]
    pub name: Option<String>,
}

/// Parse the YAML frontmatter of a SKILL.md file.
pub fn parse_header(content: &str) -> Result<ManifestHeader> {
    let frontmatter = split_frontmatter(content)
        .ok_or_else(|| Error::message("SKILL.md must start with YAML frontmatter delimited by ---"))?;
    if frontmatter.trim().is_empty() {
        return Ok(ManifestHeader::default());
    }
    Ok(serde_yaml::from_str(frontmatter)?)
}

fn split_frontmatter(content: &str) -> Option<&str> {
    let after_open = content.trim_start().strip_prefix("---")?;
    let close = after_open.find("\n---")?;
    Some(&after_open[..close])
}
