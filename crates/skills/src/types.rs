use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    hash::{content_hash, present},
    parse::{MANIFEST_FILE, parse_header},
};

/// Schema version written by this build.
pub const CURRENT_LOCK_VERSION: u32 = 3;

// ── Lock state ───────────────────────────────────────────────────────────────

/// Where an installed skill came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Url,
    Local,
    Mintlify,
    Huggingface,
    /// A source kind written by a newer client; kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl SourceType {
    /// Whether the host can hash a whole skill folder server-side.
    pub fn supports_folder_hash(&self) -> bool {
        matches!(self, Self::Github)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Github => "github",
            Self::Url => "url",
            Self::Local => "local",
            Self::Mintlify => "mintlify",
            Self::Huggingface => "huggingface",
            Self::Other(other) => other,
        };
        f.write_str(s)
    }
}

/// One installed skill as recorded in the lock file.
///
/// `name` is the map key in the persisted form and is not repeated in the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    #[serde(skip)]
    pub name: String,
    pub source: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_url: Option<String>,
    pub skill_path: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub skill_folder_hash: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Fields this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SkillRecord {
    /// Build a record for `name` from a resolved skill. Timestamps are
    /// placeholders until [`LockState::upsert`] stamps them.
    pub fn from_resolved(name: impl Into<String>, skill: &ResolvedSkill) -> Result<Self> {
        let skill_folder_hash = present(skill.folder_hash.as_deref())
            .filter(|_| skill.source_type.supports_folder_hash())
            .map(str::to_string);
        let now = Utc::now();
        Ok(Self {
            name: name.into(),
            source: skill.source.clone(),
            source_type: skill.source_type.clone(),
            source_url: skill.source_url.clone(),
            skill_path: skill.skill_path.clone(),
            content_hash: skill.content_hash()?,
            skill_folder_hash,
            installed_at: now,
            updated_at: now,
            extra: Map::new(),
        })
    }
}

/// The whole persisted lock document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    pub version: u32,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillRecord>,
    /// Records from a newer schema that this build cannot parse. Written back
    /// verbatim under `skills` on save.
    #[serde(skip)]
    pub unreadable: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LockState {
    fn default() -> Self {
        Self {
            version: CURRENT_LOCK_VERSION,
            skills: BTreeMap::new(),
            unreadable: Map::new(),
            extra: Map::new(),
        }
    }
}

impl LockState {
    /// Deserialize a document that is already at (or beyond) the current schema.
    ///
    /// Records are read one by one. A record that does not parse is dropped
    /// with a warning, except in documents from a newer schema, where it is
    /// kept in [`Self::unreadable`].
    pub fn from_value(mut value: Value) -> Result<Self> {
        let raw_skills = match value.as_object_mut().and_then(|doc| doc.remove("skills")) {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                return Err(Error::invalid_schema(format!(
                    "skills must be an object, got {other}"
                )));
            },
        };
        let mut state: Self = serde_json::from_value(value)?;
        let newer = state.version > CURRENT_LOCK_VERSION;

        for (name, raw) in raw_skills {
            match SkillRecord::deserialize(&raw) {
                Ok(mut record) => {
                    record.name.clone_from(&name);
                    state.skills.insert(name, record);
                },
                Err(e) if newer => {
                    debug!(skill = %name, error = %e, "keeping record from newer schema verbatim");
                    state.unreadable.insert(name, raw);
                },
                Err(e) => {
                    warn!(skill = %name, error = %e, "dropping unreadable lock record");
                },
            }
        }
        Ok(state)
    }

    /// Serialize for persistence, including [`Self::unreadable`] records.
    pub fn to_value(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(skills) = value.get_mut("skills").and_then(Value::as_object_mut) {
            for (name, raw) in &self.unreadable {
                skills.entry(name.clone()).or_insert_with(|| raw.clone());
            }
        }
        Ok(value)
    }

    /// Insert or replace the record keyed by `record.name`, stamping it with
    /// the current time.
    pub fn upsert(&mut self, record: SkillRecord) -> &SkillRecord {
        self.upsert_at(record, Utc::now())
    }

    /// [`Self::upsert`] with an explicit clock.
    ///
    /// `installedAt` is carried over from an existing record; `updatedAt`
    /// is always `now`.
    pub fn upsert_at(&mut self, mut record: SkillRecord, now: DateTime<Utc>) -> &SkillRecord {
        record.installed_at = self
            .skills
            .get(&record.name)
            .map_or(now, |prior| prior.installed_at);
        record.updated_at = now;
        let name = record.name.clone();
        self.unreadable.remove(&name);
        self.skills.insert(name.clone(), record);
        &self.skills[&name]
    }

    /// Remove a record. Removing an absent name is a no-op.
    pub fn remove(&mut self, name: &str) -> Option<SkillRecord> {
        self.unreadable.remove(name);
        self.skills.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&SkillRecord> {
        self.skills.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &SkillRecord> {
        self.skills.values()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

// ── Collaborator inputs ──────────────────────────────────────────────────────

/// One file of a skill, path relative to the skill's root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl SkillFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// A skill fetched by a source resolver, ready to materialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSkill {
    /// Opaque origin, e.g. `owner/repo` or an absolute directory.
    pub source: String,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    /// Manifest path within the source tree.
    pub skill_path: String,
    pub files: Vec<SkillFile>,
    /// Tree hash from the host, when it offers one.
    pub folder_hash: Option<String>,
    /// Precomputed manifest hash; computed from `files` when absent.
    pub content_hash: Option<String>,
}

impl ResolvedSkill {
    /// The `SKILL.md` at the root of `files`, if any.
    pub fn manifest(&self) -> Option<&SkillFile> {
        self.files
            .iter()
            .find(|f| f.path == Path::new(MANIFEST_FILE))
    }

    /// Manifest fingerprint: the supplied one, or SHA-256 of `SKILL.md`.
    pub fn content_hash(&self) -> Result<String> {
        if let Some(hash) = present(self.content_hash.as_deref()) {
            return Ok(hash.to_string());
        }
        self.manifest()
            .map(|m| content_hash(&m.contents))
            .ok_or_else(|| Error::MissingManifest {
                origin: self.source.clone(),
            })
    }

    /// The `name:` declared in the manifest frontmatter.
    pub fn declared_name(&self) -> Option<String> {
        let manifest = self.manifest()?;
        let text = std::str::from_utf8(&manifest.contents).ok()?;
        parse_header(text).ok()?.name.filter(|n| !n.trim().is_empty())
    }
}

/// Freshly fetched hashes for an installed skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMeta {
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub skill_folder_hash: Option<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::record,
        chrono::TimeZone,
    };

    #[test]
    fn upsert_preserves_installed_at_and_advances_updated_at() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut state = LockState::default();

        state.upsert_at(record("foo", "abc"), t1);
        let updated = state.upsert_at(record("foo", "def"), t2).clone();

        assert_eq!(state.len(), 1);
        assert_eq!(updated.content_hash, "def");
        assert_eq!(updated.installed_at, t1);
        assert_eq!(updated.updated_at, t2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut state = LockState::default();
        state.upsert(record("foo", "abc"));
        assert!(state.remove("foo").is_some());
        assert!(state.remove("foo").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn names_are_case_sensitive_keys() {
        let mut state = LockState::default();
        state.upsert(record("foo", "a"));
        state.upsert(record("Foo", "b"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("Foo").unwrap().content_hash, "b");
    }

    #[test]
    fn serializes_to_camel_case_with_name_as_key() {
        let mut state = LockState::default();
        state.upsert(record("foo", "abc"));
        let json = serde_json::to_value(&state).unwrap();

        let entry = &json["skills"]["foo"];
        assert_eq!(json["version"], 3);
        assert_eq!(entry["sourceType"], "github");
        assert_eq!(entry["contentHash"], "abc");
        assert!(entry["skillFolderHash"].is_null());
        assert!(entry.get("name").is_none());
        assert!(entry["installedAt"].as_str().unwrap().starts_with("20"));
    }

    #[test]
    fn unknown_source_type_and_fields_survive() {
        let value = serde_json::json!({
            "version": 3,
            "skills": {
                "x": {
                    "source": "gl/x",
                    "sourceType": "gitlab",
                    "sourceUrl": null,
                    "skillPath": "SKILL.md",
                    "contentHash": "h",
                    "installedAt": "2026-01-01T00:00:00Z",
                    "updatedAt": "2026-01-01T00:00:00Z",
                    "pinnedRef": "v1.2.0"
                }
            },
            "lastSyncedAt": "2026-01-02T00:00:00Z"
        });
        let state = LockState::from_value(value.clone()).unwrap();
        let rec = state.get("x").unwrap();
        assert_eq!(rec.name, "x");
        assert_eq!(rec.source_type, SourceType::Other("gitlab".into()));
        assert_eq!(rec.extra["pinnedRef"], "v1.2.0");

        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["lastSyncedAt"], value["lastSyncedAt"]);
        assert_eq!(back["skills"]["x"]["sourceType"], "gitlab");
        assert_eq!(back["skills"]["x"]["pinnedRef"], "v1.2.0");
    }

    #[test]
    fn resolved_content_hash_prefers_supplied_value() {
        let mut skill = ResolvedSkill {
            source: "owner/repo".into(),
            source_type: SourceType::Github,
            source_url: None,
            skill_path: "SKILL.md".into(),
            files: vec![SkillFile::new("SKILL.md", "---\nname: foo\n---\n")],
            folder_hash: None,
            content_hash: Some("abc".into()),
        };
        assert_eq!(skill.content_hash().unwrap(), "abc");

        skill.content_hash = None;
        assert_eq!(
            skill.content_hash().unwrap(),
            content_hash(b"---\nname: foo\n---\n")
        );
        assert_eq!(skill.declared_name().as_deref(), Some("foo"));

        skill.files.clear();
        assert!(matches!(
            skill.content_hash(),
            Err(Error::MissingManifest { .. })
        ));
    }

    #[test]
    fn folder_hash_only_kept_for_github() {
        let mut skill = ResolvedSkill {
            source: "https://example.com/skill".into(),
            source_type: SourceType::Url,
            source_url: Some("https://example.com/skill".into()),
            skill_path: "SKILL.md".into(),
            files: vec![],
            folder_hash: Some("tree".into()),
            content_hash: Some("abc".into()),
        };
        assert!(SkillRecord::from_resolved("s", &skill).unwrap().skill_folder_hash.is_none());

        skill.source_type = SourceType::Github;
        assert_eq!(
            SkillRecord::from_resolved("s", &skill)
                .unwrap()
                .skill_folder_hash
                .as_deref(),
            Some("tree")
        );
    }
}
