//! Terrain catalog: descriptive terrain name → terrain identifier.
//!
//! Loaded once and then only read. The default catalog ships with the crate
//! (`data/terrains.csv`); user catalogs can be supplied as CSV with
//! `Descriptive_Name` and `Constant_ID` columns, or as a JSON array of
//! `{"name": .., "id": ..}` objects.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MapGenError, Result};

/// Numeric terrain identifier as stored in a scenario tile.
pub type TerrainId = u16;

const NAME_COLUMN: &str = "Descriptive_Name";
const ID_COLUMN: &str = "Constant_ID";

const BUILTIN_CSV: &str = include_str!("../data/terrains.csv");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainEntry {
    pub name: String,
    pub id: TerrainId,
}

#[derive(Clone, Debug, Default)]
pub struct TerrainCatalog {
    entries: Vec<TerrainEntry>,
    by_name: HashMap<String, TerrainId>,
}

impl TerrainCatalog {
    /// Build a catalog from entries. Duplicate names keep the first entry.
    pub fn from_entries(entries: impl IntoIterator<Item = TerrainEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.by_name.contains_key(&entry.name) {
                log::warn!("duplicate terrain name {:?} ignored (id {})", entry.name, entry.id);
                continue;
            }
            catalog.by_name.insert(entry.name.clone(), entry.id);
            catalog.entries.push(entry);
        }
        catalog
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Self {
        // The bundled file is covered by tests; a parse failure here is a build defect.
        Self::from_csv_str(BUILTIN_CSV).unwrap_or_default()
    }

    /// Load from a `.json` file, or CSV for any other extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let catalog = if is_json {
            let entries: Vec<TerrainEntry> = serde_json::from_str(&text)?;
            Self::from_entries(entries)
        } else {
            Self::from_csv_str(&text)?
        };
        log::debug!("loaded {} terrains from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse CSV text. Column order is taken from the header; other columns
    /// are ignored. Blank lines are skipped.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_line, header) = lines.next().ok_or(MapGenError::MissingColumn(NAME_COLUMN))?;
        let columns = split_csv_line(header).map_err(|message| MapGenError::CatalogParse {
            line: header_line,
            message,
        })?;
        let column = |wanted: &'static str| {
            columns
                .iter()
                .position(|c| c.trim() == wanted)
                .ok_or(MapGenError::MissingColumn(wanted))
        };
        let name_col = column(NAME_COLUMN)?;
        let id_col = column(ID_COLUMN)?;

        let mut entries = Vec::new();
        for (line_no, line) in lines {
            let fields = split_csv_line(line).map_err(|message| MapGenError::CatalogParse {
                line: line_no,
                message,
            })?;
            let field = |idx: usize| {
                fields.get(idx).map(|f| f.trim()).ok_or_else(|| MapGenError::CatalogParse {
                    line: line_no,
                    message: format!("expected at least {} fields, found {}", idx + 1, fields.len()),
                })
            };
            let name = field(name_col)?.to_string();
            let raw_id = field(id_col)?;
            let id = raw_id.parse::<TerrainId>().map_err(|_| MapGenError::CatalogParse {
                line: line_no,
                message: format!("invalid terrain id {:?}", raw_id),
            })?;
            entries.push(TerrainEntry { name, id });
        }

        Ok(Self::from_entries(entries))
    }

    /// Exact-match lookup.
    pub fn id_of(&self, name: &str) -> Option<TerrainId> {
        self.by_name.get(name).copied()
    }

    /// First name registered for an identifier.
    pub fn name_of(&self, id: TerrainId) -> Option<&str> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[TerrainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split one CSV record. Supports double-quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}
