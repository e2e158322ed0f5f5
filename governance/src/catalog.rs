//! Read-only pain-point and tool catalog supplied by content ingestion.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A pain point maps to a tool that does not exist
    #[error("Pain point {pain_point} references unknown tool {tool}")]
    DanglingReference { pain_point: String, tool: String },

    /// Two entries share an id
    #[error("Duplicate id: {0}")]
    Duplicate(String),

    /// An entry is missing a required value
    #[error("Invalid catalog entry: {0}")]
    Invalid(String),

    /// Could not parse YAML
    #[error("Failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Could not parse JSON
    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Could not read the file
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// A user-facing problem category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PainPoint {
    /// Unique pain point ID
    pub id: String,
    /// Display title
    pub title: String,
    /// Owning top-level grouping
    #[serde(default)]
    pub gate: String,
    /// Candidate tools, in catalog order
    #[serde(default)]
    pub tool_ids: Vec<String>,
}

/// Difficulty of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// A few minutes, no preparation
    #[default]
    Easy,
    /// Some focus or a quiet place
    Moderate,
    /// Several steps or a longer session
    Involved,
}

/// A self-help tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Tool {
    /// Unique tool ID
    pub id: String,
    /// Display title (also the tie-break input)
    pub title: String,
    /// Short summary
    #[serde(default)]
    pub description: String,
    /// Page slug
    #[serde(default)]
    pub slug: String,
    /// Typical duration in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// How demanding the tool is
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    pain_points: Vec<PainPoint>,
    #[serde(default)]
    tools: Vec<Tool>,
}

/// Validated catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pain_points: BTreeMap<String, PainPoint>,
    tools: BTreeMap<String, Tool>,
}

impl Catalog {
    /// Build and validate a catalog.
    pub fn new(pain_points: Vec<PainPoint>, tools: Vec<Tool>) -> Result<Self, CatalogError> {
        let mut tool_map = BTreeMap::new();
        for tool in tools {
            if tool.id.trim().is_empty() {
                return Err(CatalogError::Invalid(format!("tool '{}' has no id", tool.title)));
            }
            if tool_map.contains_key(&tool.id) {
                return Err(CatalogError::Duplicate(tool.id));
            }
            tool_map.insert(tool.id.clone(), tool);
        }

        let mut pain_map = BTreeMap::new();
        for pain_point in pain_points {
            if pain_point.id.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "pain point '{}' has no id",
                    pain_point.title
                )));
            }
            if pain_map.contains_key(&pain_point.id) {
                return Err(CatalogError::Duplicate(pain_point.id));
            }
            let mut seen = HashSet::new();
            for tool_id in &pain_point.tool_ids {
                if !tool_map.contains_key(tool_id) {
                    return Err(CatalogError::DanglingReference {
                        pain_point: pain_point.id.clone(),
                        tool: tool_id.clone(),
                    });
                }
                if !seen.insert(tool_id) {
                    return Err(CatalogError::Duplicate(format!("{}::{}", pain_point.id, tool_id)));
                }
            }
            pain_map.insert(pain_point.id.clone(), pain_point);
        }

        Ok(Self {
            pain_points: pain_map,
            tools: tool_map,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.pain_points, file.tools)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.pain_points, file.tools)
    }

    /// Load by file extension (`.json`, otherwise YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    pub fn pain_point(&self, id: &str) -> Option<&PainPoint> {
        self.pain_points.get(id)
    }

    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    /// Tools mapped to a pain point, in catalog order.
    pub fn tools_for(&self, pain_point_id: &str) -> Vec<&Tool> {
        self.pain_points
            .get(pain_point_id)
            .map(|p| p.tool_ids.iter().filter_map(|id| self.tools.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn pain_points(&self) -> impl Iterator<Item = &PainPoint> {
        self.pain_points.values()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Pain points in one gate.
    pub fn gate(&self, gate: &str) -> Vec<&PainPoint> {
        self.pain_points.values().filter(|p| p.gate == gate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
pain_points:
  - id: racing-thoughts
    title: Racing thoughts at night
    gate: rest
    tool_ids: [box-breathing, worry-list]
tools:
  - id: box-breathing
    title: Box Breathing
    slug: /tools/box-breathing
    duration_minutes: 4
  - id: worry-list
    title: Worry List
    slug: /tools/worry-list
    difficulty: moderate
"#;

    #[test]
    fn test_from_yaml() {
        let catalog = Catalog::from_yaml(YAML).unwrap();
        let tools: Vec<&str> = catalog
            .tools_for("racing-thoughts")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(tools, vec!["box-breathing", "worry-list"]);
        assert_eq!(catalog.tool("worry-list").unwrap().difficulty, Difficulty::Moderate);
        assert_eq!(catalog.gate("rest").len(), 1);
        assert!(catalog.tools_for("unknown").is_empty());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "pain_points": [{ "id": "p1", "title": "P", "tool_ids": ["t1"] }],
            "tools": [{ "id": "t1", "title": "T" }]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.tools_for("p1").len(), 1);
    }

    #[test]
    fn test_dangling_reference() {
        let err = Catalog::new(
            vec![PainPoint {
                id: "p1".to_string(),
                title: "P".to_string(),
                gate: String::new(),
                tool_ids: vec!["missing".to_string()],
            }],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DanglingReference { .. }));
    }

    #[test]
    fn test_duplicate_tool() {
        let tool = Tool {
            id: "t1".to_string(),
            title: "T".to_string(),
            description: String::new(),
            slug: String::new(),
            duration_minutes: None,
            difficulty: Difficulty::Easy,
        };
        let err = Catalog::new(vec![], vec![tool.clone(), tool]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(_)));
    }
}
