//! Row shapes shared by the search pool and the bagger.
//!
//! The JSON field names below are read by the front-end and by the
//! vector-modeling consumer; they are an external contract and keep their
//! historical spellings (including `Hypenated`).

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

use crate::error::Result;

/// One unit of work popped from the queue: a fully-formed query plus an
/// optional temp-table DDL and an optional bind parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrerolledQuery {
    #[serde(rename = "TempTable", default)]
    pub temp_table: String,
    #[serde(rename = "PsqlQuery")]
    pub query: String,
    #[serde(rename = "PsqlData", default)]
    pub data: String,
}

/// One row of the corpus: a work line with its six hierarchical level values
/// and the four renderings of its text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workline {
    #[serde(rename = "WkUID")]
    pub work_uid: String,
    #[serde(rename = "TbIndex")]
    pub table_index: i32,
    #[serde(rename = "Lvl5Value")]
    pub lvl5_value: String,
    #[serde(rename = "Lvl4Value")]
    pub lvl4_value: String,
    #[serde(rename = "Lvl3Value")]
    pub lvl3_value: String,
    #[serde(rename = "Lvl2Value")]
    pub lvl2_value: String,
    #[serde(rename = "Lvl1Value")]
    pub lvl1_value: String,
    #[serde(rename = "Lvl0Value")]
    pub lvl0_value: String,
    #[serde(rename = "MarkedUp")]
    pub marked_up: String,
    #[serde(rename = "Accented")]
    pub accented: String,
    #[serde(rename = "Stripped")]
    pub stripped: String,
    #[serde(rename = "Hypenated")]
    pub hyphenated: String,
    #[serde(rename = "Annotations")]
    pub annotations: String,
}

impl Workline {
    /// Scan a row delivered by a pre-rolled queue query: work-uid first.
    pub fn from_queue_row(row: &Row) -> Result<Self> {
        Self::scan(row, 0, 1)
    }

    /// Scan a row delivered by the direct-range fallback query, whose first
    /// two columns arrive minor-swapped: table-index first.
    pub fn from_direct_row(row: &Row) -> Result<Self> {
        Self::scan(row, 1, 0)
    }

    fn scan(row: &Row, uid_col: usize, index_col: usize) -> Result<Self> {
        Ok(Self {
            work_uid: text_column(row, uid_col)?,
            table_index: row.try_get(index_col)?,
            lvl5_value: text_column(row, 2)?,
            lvl4_value: text_column(row, 3)?,
            lvl3_value: text_column(row, 4)?,
            lvl2_value: text_column(row, 5)?,
            lvl1_value: text_column(row, 6)?,
            lvl0_value: text_column(row, 7)?,
            marked_up: text_column(row, 8)?,
            accented: text_column(row, 9)?,
            stripped: text_column(row, 10)?,
            hyphenated: text_column(row, 11)?,
            annotations: text_column(row, 12)?,
        })
    }
}

// NULL level values scan as empty strings so every serialized workline
// carries all 13 fields.
fn text_column(row: &Row, idx: usize) -> Result<String> {
    Ok(row.try_get::<_, Option<String>>(idx)?.unwrap_or_default())
}
