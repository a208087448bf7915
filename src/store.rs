use std::fs;
use std::path::{Path, PathBuf};

use crate::error::QuoteError;
use crate::model::QuotationRecord;

const FILE_PREFIX: &str = "quotation_";
const FILE_SUFFIX: &str = ".json";

/// Flat-directory storage for quotation records. One JSON file per record,
/// named by its zero-padded quote number; the matching PDF sits next to it.
pub struct QuoteStore {
    dir: PathBuf,
}

impl QuoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, QuoteError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(QuoteStore { dir })
    }

    pub fn json_path(&self, quote_number: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{quote_number}{FILE_SUFFIX}"))
    }

    pub fn pdf_path(&self, quote_number: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{quote_number}.pdf"))
    }

    /// Writes the record as pretty-printed JSON, overwriting any file already
    /// using that quote number.
    pub fn save(&self, record: &QuotationRecord) -> Result<PathBuf, QuoteError> {
        let path = self.json_path(&record.quote_number);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Loads every `quotation_*.json` in the directory, newest date first. A
    /// file that fails to read or parse is reported and skipped; the rest of
    /// the scan proceeds.
    pub fn load_all(&self) -> Result<Vec<QuotationRecord>, QuoteError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !is_record_file(&path) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("skipping {}: {err}", path.display()),
            }
        }
        // The stored DD-MM-YYYY string is the sort key, compared as text.
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    /// History search: case-insensitive substring match over every field
    /// value of every record. An empty term returns everything.
    pub fn search(&self, term: &str) -> Result<Vec<QuotationRecord>, QuoteError> {
        let records = self.load_all()?;
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|record| record.search_text().to_lowercase().contains(&term))
            .collect())
    }

    /// Next quote number for a fresh session: one past the highest number
    /// already persisted in this directory, or 1 when there is none.
    pub fn next_sequence(&self) -> u32 {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 1;
        };
        let mut max = 0u32;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(number) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            if let Ok(n) = number.parse::<u32>() {
                max = max.max(n);
            }
        }
        max + 1
    }
}

fn is_record_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
}

fn read_record(path: &Path) -> Result<QuotationRecord, QuoteError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
