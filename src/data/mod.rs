use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{ChartError, LoadError};

pub const LOCATION_COLUMN: &str = "Where do you buy food more often?";
pub const REASON_COLUMN: &str =
    "What is the main reason you choose to buy food online? (Choose a maximum of 2)";
pub const OBSTACLE_COLUMN: &str =
    "What are the most common obstacles you experience when buying food at the canteen?";

pub const EXPECTED_COLUMNS: [&str; 3] = [LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN];

/// Cell contents read as missing, same set pandas treats as NaN by default.
const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

type Row = Vec<Option<String>>;

/// Survey responses, one row per respondent. Missing cells are `None`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    path: Option<PathBuf>,
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: Option<String>,
    pub hash_sha256: Option<String>,
    pub row_count: u64,
    pub columns: Vec<String>,
    pub missing_columns: Vec<String>,
}

/// Borrowed view over one column of a [`Dataset`].
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    name: &'a str,
    index: usize,
    rows: &'a [Row],
}

impl<'a> Column<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn values(&self) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let index = self.index;
        let rows = self.rows;
        rows.iter()
            .map(move |row| row.get(index).and_then(|cell| cell.as_deref()))
    }

    /// Present values only, the equivalent of a `dropna()`.
    pub fn present(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.values().flatten()
    }
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut dataset = Self::from_reader(file).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if dataset.columns.is_empty() {
            return Err(LoadError::MissingHeader {
                path: path.to_path_buf(),
            });
        }
        dataset.path = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Parse a header-row CSV. Rows shorter than the header are padded
    /// with missing cells, extra trailing fields are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row: Row = (0..columns.len())
                .map(|i| record.get(i).and_then(parse_cell))
                .collect();
            rows.push(row);
        }

        Ok(Self {
            path: None,
            columns,
            rows,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<Column<'_>, ChartError> {
        let index = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ChartError::MissingColumn(name.to_string()))?;
        Ok(Column {
            name: &self.columns[index],
            index,
            rows: &self.rows,
        })
    }

    pub fn missing_columns(&self, expected: &[&str]) -> Vec<String> {
        expected
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn manifest(&self) -> DatasetManifest {
        let hash_sha256 = self.path.as_deref().and_then(|p| file_sha256(p).ok());
        DatasetManifest {
            path: self.path.as_ref().map(|p| p.display().to_string()),
            hash_sha256,
            row_count: self.rows.len() as u64,
            columns: self.columns.clone(),
            missing_columns: self.missing_columns(&EXPECTED_COLUMNS),
        }
    }
}

fn parse_cell(raw: &str) -> Option<String> {
    if NA_VALUES.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

pub fn file_sha256(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| e.to_string())?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
