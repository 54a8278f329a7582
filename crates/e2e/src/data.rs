//! Data-driven test records loaded from JSON or YAML files
//!
//! A data file holds either a bare list of records or a mapping with a
//! `cases` list. Records are typed and checked one by one when loaded; an
//! unknown field or a missing required one rejects that record instead of
//! failing later on field access. The rest of the file stays usable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// One search scenario variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchCase {
    /// Unique name for this case
    pub name: String,

    /// Query typed into the search box
    pub query: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Tags for filtering cases
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default)]
    pub issues: Vec<IssueRef>,

    #[serde(default)]
    pub expected: ExpectedResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueRef {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedResults {
    /// At least this many results must be shown
    #[serde(default)]
    pub min_results: Option<usize>,

    /// Every entry must appear (case-insensitive) in some result title
    #[serde(default)]
    pub title_contains: Vec<String>,

    /// The results page URL must contain this
    #[serde(default)]
    pub url_contains: Option<String>,

    /// How many results to read from the page
    #[serde(default = "default_read_limit")]
    pub read_limit: usize,
}

fn default_read_limit() -> usize {
    10
}

impl Default for ExpectedResults {
    fn default() -> Self {
        Self {
            min_results: None,
            title_contains: Vec::new(),
            url_contains: None,
            read_limit: default_read_limit(),
        }
    }
}

impl SearchCase {
    /// Check constraints serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.query.trim().is_empty() {
            return Err(format!("case '{}': query must not be empty", self.name));
        }
        if self.expected.min_results == Some(0) {
            return Err(format!("case '{}': min_results must be at least 1", self.name));
        }
        if self.expected.read_limit == 0 {
            return Err(format!("case '{}': read_limit must be at least 1", self.name));
        }
        if let Some(n) = self.expected.min_results {
            if n > self.expected.read_limit {
                return Err(format!(
                    "case '{}': min_results ({}) exceeds read_limit ({})",
                    self.name, n, self.expected.read_limit
                ));
            }
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A record that could not be turned into a [`SearchCase`]
#[derive(Debug)]
pub struct RejectedRecord {
    /// One-based position in the file
    pub index: usize,

    /// `name` and `tags` as far as they could be read from the raw record
    pub name: Option<String>,
    pub tags: Vec<String>,

    pub error: E2eError,
}

impl RejectedRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Records of one document, split into usable cases and rejects
#[derive(Debug, Default)]
pub struct ParsedCases {
    pub cases: Vec<SearchCase>,
    pub rejected: Vec<RejectedRecord>,
}

/// Result of loading one data file.
///
/// `Err` means the document itself is unusable; bad records inside a
/// readable document end up in [`ParsedCases::rejected`].
#[derive(Debug)]
pub struct DataFile {
    pub path: PathBuf,
    pub result: E2eResult<ParsedCases>,
}

fn data_error(path: &Path, reason: impl Into<String>) -> E2eError {
    E2eError::DataLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "json" || ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

fn raw_name(record: &Value) -> Option<String> {
    record.get("name").and_then(Value::as_str).map(String::from)
}

fn raw_tags(record: &Value) -> Vec<String> {
    record
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

/// Parse every record of a document independently.
///
/// `path` selects the format and labels errors. A record that fails to
/// deserialize or validate, or repeats an earlier name, is rejected on its
/// own; the others are still returned.
pub fn parse_records(path: &Path, content: &str) -> E2eResult<ParsedCases> {
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    let document: Value = if is_json {
        serde_json::from_str(content).map_err(|e| data_error(path, e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| data_error(path, e.to_string()))?
    };

    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("cases") {
            Some(Value::Array(records)) => records,
            _ => return Err(data_error(path, "expected a list of cases or a `cases` list")),
        },
        _ => return Err(data_error(path, "expected a list of cases or a `cases` list")),
    };

    let mut seen = HashSet::new();
    let mut parsed = ParsedCases::default();
    for (offset, record) in records.into_iter().enumerate() {
        let index = offset + 1;
        let name = raw_name(&record);
        let tags = raw_tags(&record);

        let checked = serde_json::from_value::<SearchCase>(record)
            .map_err(|e| e.to_string())
            .and_then(|case| case.validate().map(|()| case))
            .and_then(|case| {
                if seen.insert(case.name.clone()) {
                    Ok(case)
                } else {
                    Err(format!("duplicate case name '{}'", case.name))
                }
            });

        match checked {
            Ok(case) => parsed.cases.push(case),
            Err(reason) => parsed.rejected.push(RejectedRecord {
                index,
                name,
                tags,
                error: data_error(path, format!("record #{}: {}", index, reason)),
            }),
        }
    }

    Ok(parsed)
}

/// Parse records, failing on the first bad one
pub fn parse_cases(path: &Path, content: &str) -> E2eResult<Vec<SearchCase>> {
    let parsed = parse_records(path, content)?;
    match parsed.rejected.into_iter().next() {
        Some(rejected) => Err(rejected.error),
        None => Ok(parsed.cases),
    }
}

/// Load every record of one file
pub fn load_file(path: &Path) -> E2eResult<ParsedCases> {
    let content = std::fs::read_to_string(path).map_err(|e| data_error(path, e.to_string()))?;
    let parsed = parse_records(path, &content)?;
    for rejected in &parsed.rejected {
        warn!("{}", rejected.error);
    }
    debug!(
        "Loaded {} case(s) from {} ({} rejected)",
        parsed.cases.len(),
        path.display(),
        parsed.rejected.len()
    );
    Ok(parsed)
}

/// Load all data files below `dir`.
///
/// Each file is loaded independently so a malformed file only fails the
/// scenarios that depend on it.
pub fn load_dir(dir: &Path) -> E2eResult<Vec<DataFile>> {
    if !dir.is_dir() {
        return Err(data_error(dir, "data directory not found"));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_data_file(e.path()))
    {
        let path = entry.path().to_path_buf();
        let result = load_file(&path);
        if let Err(e) = &result {
            warn!("{}", e);
        }
        files.push(DataFile { path, result });
    }

    Ok(files)
}

/// Filter cases by tag
pub fn filter_by_tag<'a>(cases: &'a [SearchCase], tag: &str) -> Vec<&'a SearchCase> {
    cases.iter().filter(|c| c.has_tag(tag)).collect()
}

pub fn find_by_name<'a>(cases: &'a [SearchCase], name: &str) -> Option<&'a SearchCase> {
    cases.iter().find(|c| c.name == name)
}
