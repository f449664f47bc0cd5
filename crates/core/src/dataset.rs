//! Parsing of transaction text into in-memory baskets.
//!
//! These functions only look at strings; reading files is left to callers.

use std::str::FromStr;

use csv::{Position, ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use crate::errors::MiningError;

pub type Transaction = Vec<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    /// One transaction per line, items separated by commas.
    Baskets,
    /// Header of item names, one 0/1 row per transaction.
    OneHotCsv,
}

impl FromStr for DatasetFormat {
    type Err = MiningError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "baskets" => Ok(Self::Baskets),
            "one_hot_csv" | "one-hot-csv" | "onehot" => Ok(Self::OneHotCsv),
            other => Err(MiningError::invalid_parameter(format!(
                "unsupported dataset format `{other}` (expected baskets|one_hot_csv)"
            ))),
        }
    }
}

impl DatasetFormat {
    /// Name accepted by config files and `BASKETRY_DATASET_FORMAT`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baskets => "baskets",
            Self::OneHotCsv => "one_hot_csv",
        }
    }

    pub fn parse(self, text: &str) -> Result<Vec<Transaction>, MiningError> {
        match self {
            Self::Baskets => Ok(parse_baskets(text)),
            Self::OneHotCsv => parse_one_hot_csv(text),
        }
    }
}

/// Parses comma separated baskets. Blank lines and `#` comments are skipped.
pub fn parse_baskets(text: &str) -> Vec<Transaction> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .collect()
}

/// Parses a one-hot encoded table.
///
/// Fields follow CSV quoting, so item names may contain commas. A leading
/// index column (empty or `Unnamed: 0` header) is ignored.
pub fn parse_one_hot_csv(text: &str) -> Result<Vec<Transaction>, MiningError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = header.map_err(malformed)?.iter().map(str::to_owned).collect();
    let skip_index = columns
        .first()
        .is_some_and(|first| first.is_empty() || first.eq_ignore_ascii_case("unnamed: 0"));
    let first_item = usize::from(skip_index);

    if columns[first_item..].iter().any(String::is_empty) {
        return Err(MiningError::invalid_input("one-hot header contains an empty item name"));
    }

    let mut transactions = Vec::new();
    for record in records {
        let record = record.map_err(malformed)?;
        let line_number = record.position().map_or(0, Position::line);
        if record.len() != columns.len() {
            return Err(MiningError::invalid_input(format!(
                "line {line_number}: expected {} columns, found {}",
                columns.len(),
                record.len()
            )));
        }

        let mut transaction = Vec::new();
        for (column, cell) in columns.iter().zip(record.iter()).skip(first_item) {
            if parse_flag(cell).ok_or_else(|| {
                MiningError::invalid_input(format!(
                    "line {line_number}, column `{column}`: `{cell}` is not a 0/1 flag"
                ))
            })? {
                transaction.push(column.clone());
            }
        }
        transactions.push(transaction);
    }

    Ok(transactions)
}

fn malformed(error: csv::Error) -> MiningError {
    MiningError::invalid_input(format!("malformed one-hot table: {error}"))
}

fn parse_flag(cell: &str) -> Option<bool> {
    match cell {
        "1" | "1.0" | "true" | "True" | "TRUE" => Some(true),
        "" | "0" | "0.0" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}
