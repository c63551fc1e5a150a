use crate::errors::CatalogError;
use crate::language::Language;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const ENGLISH_COLUMNS: &[&str] = &["english", "english_name"];
const CLASS_INDEX_COLUMNS: &[&str] = &["class_number", "class_index"];
const TRANSLATED_COLUMNS: &[&str] = &["russian", "translated", "translated_name"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationEntry {
    pub translated_name: String,
    pub class_index: u32,
}

/// Disagreement between the table and the engine's class vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableMismatch {
    IndexDiffers {
        name: String,
        table_index: u32,
        engine_index: u32,
    },
    UnknownClass {
        name: String,
    },
}

/// English class name -> translation, loaded from a CSV table.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    identifier: String,
    entries: HashMap<String, TranslationEntry>,
}

struct Columns {
    english: usize,
    class_index: usize,
    translated: usize,
}

impl TranslationTable {
    /// Load `<dir>/<identifier>`.
    pub fn load(dir: impl AsRef<Path>, identifier: &str) -> Result<Self, CatalogError> {
        let path = dir.as_ref().join(identifier);
        let file = File::open(&path).map_err(|e| CatalogError::translation(&path, e))?;

        let table = Self::parse(identifier, file)
            .map_err(|reason| CatalogError::translation(&path, reason))?;

        tracing::info!(
            path = %path.display(),
            classes = table.len(),
            "Translation table loaded"
        );

        Ok(table)
    }

    /// Parse a table from any reader; errors carry `identifier` as the path.
    pub fn from_reader<R: Read>(identifier: &str, reader: R) -> Result<Self, CatalogError> {
        Self::parse(identifier, reader)
            .map_err(|reason| CatalogError::translation(PathBuf::from(identifier), reason))
    }

    fn parse<R: Read>(identifier: &str, reader: R) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        let columns = Columns::resolve(&headers)?;

        let mut entries = HashMap::new();

        for (i, record) in reader.records().enumerate() {
            let row = i + 1;
            let record = record.map_err(|e| format!("row {}: {}", row, e))?;

            let english = field(&record, columns.english, "english name", row)?;
            let class_index = field(&record, columns.class_index, "class index", row)?;
            let translated = field(&record, columns.translated, "translated name", row)?;

            let class_index: u32 = class_index.parse().map_err(|_| {
                format!(
                    "row {}: class index '{}' is not a non-negative integer",
                    row, class_index
                )
            })?;

            let previous = entries.insert(
                english.to_string(),
                TranslationEntry {
                    translated_name: translated.to_string(),
                    class_index,
                },
            );

            if previous.is_some() {
                tracing::debug!(row, class = english, "Duplicate class name, keeping last row");
            }
        }

        Ok(Self {
            identifier: identifier.to_string(),
            entries,
        })
    }

    /// Translated label for `language`, or `label` itself when there is none.
    pub fn translate<'a>(&'a self, label: &'a str, language: Language) -> &'a str {
        match language {
            Language::Source => label,
            Language::Target => self
                .entries
                .get(label)
                .map(|entry| entry.translated_name.as_str())
                .unwrap_or(label),
        }
    }

    pub fn get(&self, label: &str) -> Option<&TranslationEntry> {
        self.entries.get(label)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &TranslationEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare the table against the engine's `(index, name)` vocabulary.
    pub fn mismatches<'v>(
        &self,
        vocabulary: impl IntoIterator<Item = (u32, &'v str)>,
    ) -> Vec<TableMismatch> {
        let engine: HashMap<&str, u32> = vocabulary
            .into_iter()
            .map(|(index, name)| (name, index))
            .collect();

        let mut mismatches: Vec<TableMismatch> = self
            .entries
            .iter()
            .filter_map(|(name, entry)| match engine.get(name.as_str()) {
                None => Some(TableMismatch::UnknownClass { name: name.clone() }),
                Some(&engine_index) if engine_index != entry.class_index => {
                    Some(TableMismatch::IndexDiffers {
                        name: name.clone(),
                        table_index: entry.class_index,
                        engine_index,
                    })
                }
                Some(_) => None,
            })
            .collect();

        mismatches.sort_by(|a, b| mismatch_name(a).cmp(mismatch_name(b)));
        mismatches
    }
}

fn mismatch_name(mismatch: &TableMismatch) -> &str {
    match mismatch {
        TableMismatch::IndexDiffers { name, .. } | TableMismatch::UnknownClass { name } => name,
    }
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, String> {
        let find = |candidates: &[&str]| {
            headers.iter().position(|header| {
                let header = header.trim_start_matches('\u{feff}').to_lowercase();
                candidates.contains(&header.as_str())
            })
        };

        let missing =
            |candidates: &[&str]| format!("missing column, expected one of {:?}", candidates);

        Ok(Self {
            english: find(ENGLISH_COLUMNS).ok_or_else(|| missing(ENGLISH_COLUMNS))?,
            class_index: find(CLASS_INDEX_COLUMNS).ok_or_else(|| missing(CLASS_INDEX_COLUMNS))?,
            translated: find(TRANSLATED_COLUMNS).ok_or_else(|| missing(TRANSLATED_COLUMNS))?,
        })
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, String> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("row {}: missing {}", row, name)),
    }
}
