//! Typed résumé document.
//!
//! The store edits the document as raw JSON; this model is the typed read side used for
//! sanitising incoming documents and building previews. Unknown fields are carried in
//! `extra` so a typed round trip never drops template-specific data.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::document::engine::IdSource;

const COLLECTIONS: &[&str] = &["experience", "education", "skills", "sections", "dynamicSections"];
const STRING_LISTS: &[&str] = &["bulletPoints", "honors", "coursework"];
const DEFAULT_SKILL_LEVEL: u32 = 10;
const DEFAULT_SKILL_CATEGORY: &str = "core";
const PRESENT: &str = "Present";

// ────────────────────────────────────────────────────────────────────────────
// Document types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeData {
    pub personal_info: PersonalInfo,
    pub include_social_links: bool,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub skills: Vec<SkillItem>,
    pub sections: Vec<CustomSection>,
    pub dynamic_sections: Vec<DynamicSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ResumeData {
    fn default() -> Self {
        Self {
            personal_info: PersonalInfo::default(),
            include_social_links: true,
            experience: Vec::new(),
            education: Vec::new(),
            skills: Vec::new(),
            sections: Vec::new(),
            dynamic_sections: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub summary: String,
    pub photo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceItem {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    /// When set, the end date renders as "Present".
    pub current: bool,
    /// Legacy free text; only consulted when `bullet_points` is empty.
    pub description: String,
    pub bullet_points: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationItem {
    pub id: String,
    pub school: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    pub honors: Vec<String>,
    pub coursework: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomSection {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Display position; array order is not meaningful.
    #[serde(default)]
    pub order: i64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub data: DynamicSectionData,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DynamicSectionData {
    Summary {
        #[serde(default)]
        content: String,
    },
    Experience {
        #[serde(default)]
        items: Vec<Value>,
    },
    Education {
        #[serde(default)]
        items: Vec<Value>,
    },
    Skills {
        #[serde(default)]
        items: Vec<Value>,
    },
    Certifications {
        #[serde(default)]
        items: Vec<Value>,
    },
    Languages {
        #[serde(default)]
        items: Vec<Value>,
    },
    Projects {
        #[serde(default)]
        items: Vec<Value>,
    },
    Awards {
        #[serde(default)]
        items: Vec<Value>,
    },
    Custom {
        #[serde(default)]
        content: String,
        #[serde(default)]
        items: Vec<Value>,
    },
}

impl Default for DynamicSectionData {
    fn default() -> Self {
        DynamicSectionData::Custom {
            content: String::new(),
            items: Vec::new(),
        }
    }
}

impl DynamicSectionData {
    pub fn type_str(&self) -> &'static str {
        match self {
            DynamicSectionData::Summary { .. } => "summary",
            DynamicSectionData::Experience { .. } => "experience",
            DynamicSectionData::Education { .. } => "education",
            DynamicSectionData::Skills { .. } => "skills",
            DynamicSectionData::Certifications { .. } => "certifications",
            DynamicSectionData::Languages { .. } => "languages",
            DynamicSectionData::Projects { .. } => "projects",
            DynamicSectionData::Awards { .. } => "awards",
            DynamicSectionData::Custom { .. } => "custom",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sanitising
// ────────────────────────────────────────────────────────────────────────────

/// Coerces an arbitrary incoming document into a well-formed `ResumeData`.
///
/// - non-array collections become empty, null collection entries become blank items,
///   null fields take their defaults (see [`repair_shape`])
/// - items without a unique non-empty id get a fresh one
/// - experience items with no non-empty bullet take their bullets from `description`
///   (one per non-blank line) and the description is cleared
/// - skills default to level 10 in category "core"
pub fn sanitize(raw: Value, ids: &dyn IdSource) -> Result<ResumeData, serde_json::Error> {
    let mut root = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    repair_shape(&mut root);

    let mut data: ResumeData = serde_json::from_value(Value::Object(root))?;

    for experience in &mut data.experience {
        experience.migrate_description();
    }
    for skill in &mut data.skills {
        skill.level = skill.level.or(Some(DEFAULT_SKILL_LEVEL));
        if skill.category.is_none() {
            skill.category = Some(DEFAULT_SKILL_CATEGORY.to_string());
        }
    }

    assign_missing_ids(data.experience.iter_mut().map(|i| &mut i.id), ids);
    assign_missing_ids(data.education.iter_mut().map(|i| &mut i.id), ids);
    assign_missing_ids(data.skills.iter_mut().map(|i| &mut i.id), ids);
    assign_missing_ids(data.sections.iter_mut().map(|i| &mut i.id), ids);
    assign_missing_ids(data.dynamic_sections.iter_mut().map(|i| &mut i.id), ids);

    Ok(data)
}

impl ResumeData {
    /// Reads a document as edited, for display. Shape problems that edits can introduce
    /// (nulls, bare-string skills, stray list entries) are repaired on a copy; nothing
    /// is migrated and no ids are assigned.
    pub fn from_document(document: &Value) -> Result<Self, serde_json::Error> {
        let mut root = match document {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        repair_shape(&mut root);
        serde_json::from_value(Value::Object(root))
    }
}

/// Brings a raw document into the shape the typed model reads:
/// null fields are removed so they take their defaults, non-array collections are
/// removed, null entries become blank items, bare strings in `skills` become
/// `{ "name": .. }`, other primitive entries are skipped, and string lists keep only
/// their strings.
fn repair_shape(root: &mut Map<String, Value>) {
    drop_null_fields(root);
    match root.get_mut("personalInfo") {
        Some(Value::Object(info)) => drop_null_fields(info),
        Some(_) => {
            root.remove("personalInfo");
        }
        None => {}
    }
    for key in COLLECTIONS {
        match root.get_mut(*key) {
            Some(Value::Array(items)) => items.retain_mut(|item| repair_item(key, item)),
            Some(_) => {
                root.remove(*key);
            }
            None => {}
        }
    }
}

/// Returns false for entries that cannot become an item of `collection`.
fn repair_item(collection: &str, item: &mut Value) -> bool {
    match item {
        Value::Object(fields) => {
            drop_null_fields(fields);
            for list in STRING_LISTS {
                match fields.get_mut(*list) {
                    Some(Value::Array(entries)) => entries.retain(Value::is_string),
                    Some(_) => {
                        fields.remove(*list);
                    }
                    None => {}
                }
            }
            true
        }
        Value::Null => {
            *item = Value::Object(Map::new());
            true
        }
        Value::String(name) if collection == "skills" => {
            let name = std::mem::take(name);
            *item = json!({ "name": name });
            true
        }
        _ => false,
    }
}

/// `null` fields fall back to their defaults instead of failing to deserialise.
fn drop_null_fields(fields: &mut Map<String, Value>) {
    fields.retain(|_, value| !value.is_null());
}

fn assign_missing_ids<'a>(slots: impl Iterator<Item = &'a mut String>, ids: &dyn IdSource) {
    let mut seen = HashSet::new();
    for slot in slots {
        if slot.is_empty() || !seen.insert(slot.clone()) {
            *slot = ids.next_id();
            seen.insert(slot.clone());
        }
    }
}

fn description_lines(description: &str) -> Vec<String> {
    description
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '•']).trim_start())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Read helpers for renderers
// ────────────────────────────────────────────────────────────────────────────

impl ExperienceItem {
    fn has_bullets(&self) -> bool {
        self.bullet_points.iter().any(|b| !b.trim().is_empty())
    }

    fn migrate_description(&mut self) {
        if self.has_bullets() || self.description.trim().is_empty() {
            return;
        }
        self.bullet_points = self
            .description
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.description.clear();
    }

    /// The achievements to display: `bullet_points` when non-empty, otherwise the
    /// description split into lines with leading `-`/`•` markers removed.
    pub fn effective_bullet_points(&self) -> Vec<String> {
        if !self.bullet_points.is_empty() {
            return self.bullet_points.clone();
        }
        description_lines(&self.description)
    }

    pub fn date_range(&self) -> String {
        format_date_range(&self.start_date, &self.end_date, self.current)
    }
}

impl EducationItem {
    pub fn date_range(&self) -> String {
        format_date_range(&self.start_date, &self.end_date, self.current)
    }
}

/// `"2020-01"` → `"Jan 2020"`. Full dates are accepted; anything else passes through.
pub fn format_year_month(date: &str) -> String {
    let date = date.trim();
    if date.is_empty() {
        return String::new();
    }
    NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_date_range(start: &str, end: &str, current: bool) -> String {
    let start = format_year_month(start);
    let end = if current {
        PRESENT.to_string()
    } else {
        format_year_month(end)
    };

    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{start} - {end}"),
        (false, true) => start,
        (true, false) => end,
        (true, true) => String::new(),
    }
}

/// An id carried by more than one item of the same collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateId {
    pub collection: &'static str,
    pub id: String,
}

impl ResumeData {
    /// Enabled dynamic sections in display order. Ties keep document order.
    pub fn visible_dynamic_sections(&self) -> Vec<&DynamicSection> {
        let mut visible: Vec<_> = self.dynamic_sections.iter().filter(|s| s.enabled).collect();
        visible.sort_by_key(|s| s.order);
        visible
    }

    pub fn duplicate_ids(&self) -> Vec<DuplicateId> {
        let mut found = Vec::new();
        collect_duplicates("experience", self.experience.iter().map(|i| &i.id), &mut found);
        collect_duplicates("education", self.education.iter().map(|i| &i.id), &mut found);
        collect_duplicates("skills", self.skills.iter().map(|i| &i.id), &mut found);
        collect_duplicates("sections", self.sections.iter().map(|i| &i.id), &mut found);
        collect_duplicates(
            "dynamicSections",
            self.dynamic_sections.iter().map(|i| &i.id),
            &mut found,
        );
        found
    }
}

fn collect_duplicates<'a>(
    collection: &'static str,
    ids: impl Iterator<Item = &'a String>,
    found: &mut Vec<DuplicateId>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            found.push(DuplicateId {
                collection,
                id: id.clone(),
            });
        }
    }
}
