use {
    chrono::{DateTime, Utc},
    serde_json::Map,
};

use crate::types::{ResolvedSkill, SkillFile, SkillRecord, SourceType};

/// A GitHub-sourced record for `name` with the given content hash.
pub(crate) fn record(name: &str, hash: &str) -> SkillRecord {
    SkillRecord {
        name: name.to_string(),
        source: "owner/repo".into(),
        source_type: SourceType::Github,
        source_url: Some("https://github.com/owner/repo.git".into()),
        skill_path: format!("skills/{name}/SKILL.md"),
        content_hash: hash.to_string(),
        skill_folder_hash: None,
        installed_at: DateTime::<Utc>::UNIX_EPOCH,
        updated_at: DateTime::<Utc>::UNIX_EPOCH,
        extra: Map::new(),
    }
}

/// A GitHub skill named `name` carrying a precomputed content hash.
pub(crate) fn resolved(name: &str, hash: &str) -> ResolvedSkill {
    ResolvedSkill {
        source: "owner/repo".into(),
        source_type: SourceType::Github,
        source_url: Some("https://github.com/owner/repo.git".into()),
        skill_path: format!("skills/{name}/SKILL.md"),
        files: vec![
            SkillFile::new("SKILL.md", format!("---\nname: {name}\n---\n{hash}\n")),
            SkillFile::new("reference.md", "notes\n"),
        ],
        folder_hash: None,
        content_hash: Some(hash.to_string()),
    }
}
