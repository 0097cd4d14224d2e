use crate::shared::Time;
use chrono::NaiveDate;
use csv::StringRecord;
use std::{collections::HashMap, str::FromStr};
use thiserror::Error;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("missing column {0}")]
    MissingColumn(&'static str),
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid value {value:?} for {column}")]
    Invalid { column: &'static str, value: String },
}

/// Column name to index lookup built from a header row.
#[derive(Debug, Default, Clone)]
pub struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    pub fn from_header(header: &StringRecord) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = if i == 0 {
                    name.trim_start_matches(BYTE_ORDER_MARK)
                } else {
                    name
                };
                (name.trim().to_string(), i)
            })
            .collect();
        Self { index }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn row<'a>(&'a self, record: &'a StringRecord) -> Row<'a> {
        Row {
            columns: self,
            record,
        }
    }
}

/// One data row viewed through its header.
pub struct Row<'a> {
    columns: &'a Columns,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Empty cells and absent columns both read as `None`.
    pub fn optional(&self, column: &'static str) -> Option<&'a str> {
        let index = self.columns.get(column)?;
        self.record
            .get(index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn required(&self, column: &'static str) -> Result<&'a str, FieldError> {
        if self.columns.get(column).is_none() {
            return Err(FieldError::MissingColumn(column));
        }
        self.optional(column)
            .ok_or(FieldError::MissingValue(column))
    }

    pub fn string(&self, column: &'static str) -> Result<String, FieldError> {
        self.required(column).map(str::to_string)
    }

    pub fn optional_string(&self, column: &'static str) -> Option<String> {
        self.optional(column).map(str::to_string)
    }

    pub fn parse_required<T: FromStr>(&self, column: &'static str) -> Result<T, FieldError> {
        let value = self.required(column)?;
        parse(column, value)
    }

    pub fn parse_optional<T: FromStr>(&self, column: &'static str) -> Result<Option<T>, FieldError> {
        self.optional(column)
            .map(|value| parse(column, value))
            .transpose()
    }

    pub fn time(&self, column: &'static str) -> Result<Option<Time>, FieldError> {
        self.optional(column)
            .map(|value| Time::from_hms(value).ok_or_else(|| invalid(column, value)))
            .transpose()
    }

    /// `YYYYMMDD`
    pub fn date(&self, column: &'static str) -> Result<NaiveDate, FieldError> {
        let value = self.required(column)?;
        NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid(column, value))
    }

    pub fn flag(&self, column: &'static str) -> Result<bool, FieldError> {
        match self.required(column)? {
            "0" => Ok(false),
            "1" => Ok(true),
            value => Err(invalid(column, value)),
        }
    }
}

fn parse<T: FromStr>(column: &'static str, value: &str) -> Result<T, FieldError> {
    value.parse().map_err(|_| invalid(column, value))
}

fn invalid(column: &'static str, value: &str) -> FieldError {
    FieldError::Invalid {
        column,
        value: value.to_string(),
    }
}
