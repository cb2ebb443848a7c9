use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DashError, Result};

/// Tabular data shown by a data-table component and offered for download
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,

    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, failing when its width differs from the header
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DashError::Config(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Result<Self> {
        self.push_row(row)?;
        Ok(self)
    }

    /// Header names, using spreadsheet letters for blank column names
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    column_to_letter(i as u16 + 1)
                } else {
                    name.clone()
                }
            })
            .collect()
    }

    /// Convert the table to CSV format
    ///
    /// The first line holds the headers. Fields containing commas, quotes
    /// or newlines are quoted with inner quotes doubled; nulls become empty
    /// fields.
    ///
    /// # Examples
    /// ```
    /// use dashkit::table::DataTable;
    /// use serde_json::json;
    ///
    /// let table = DataTable::new(["city", "pop"]).with_row(vec![json!("Oslo"), json!(709)]).unwrap();
    /// assert_eq!(table.to_csv(), "city,pop\nOslo,709\n");
    /// ```
    pub fn to_csv(&self) -> String {
        let mut csv_content = String::new();

        for (c, header) in self.headers().iter().enumerate() {
            if c > 0 {
                csv_content.push(',');
            }
            csv_content.push_str(&escape_field(header));
        }
        csv_content.push('\n');

        for row in &self.rows {
            for (c, value) in row.iter().enumerate() {
                if c > 0 {
                    csv_content.push(',');
                }
                csv_content.push_str(&escape_field(&cell_text(value)));
            }
            csv_content.push('\n');
        }

        csv_content
    }

    /// Convert the table to XLSX format
    ///
    /// Numbers are written as numeric cells, booleans and strings as text.
    #[cfg(feature = "web")]
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        use rust_xlsxwriter::{Workbook, Worksheet};

        let xlsx_err = |e: rust_xlsxwriter::XlsxError| DashError::Export(e.to_string());

        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();

        for (c, header) in self.headers().iter().enumerate() {
            worksheet
                .write_string(0, c as u16, header.as_str())
                .map_err(xlsx_err)?;
        }

        for (r, row) in self.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                let c = c as u16;
                match value {
                    Value::Null => {}
                    Value::Number(n) => {
                        worksheet
                            .write_number(r, c, n.as_f64().unwrap_or_default())
                            .map_err(xlsx_err)?;
                    }
                    other => {
                        worksheet
                            .write_string(r, c, cell_text(other).as_str())
                            .map_err(xlsx_err)?;
                    }
                }
            }
        }

        workbook.push_worksheet(worksheet);
        workbook.save_to_buffer().map_err(xlsx_err)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert column number to letter (A=1, B=2, ..., Z=26, AA=27)
///
/// # Examples
/// ```
/// use dashkit::table::column_to_letter;
///
/// assert_eq!(column_to_letter(1), "A");
/// assert_eq!(column_to_letter(27), "AA");
/// assert_eq!(column_to_letter(52), "AZ");
/// ```
pub fn column_to_letter(col: u16) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_quotes_special_fields() {
        let table = DataTable::new(["name", "note"])
            .with_row(vec![json!("a,b"), json!("say \"hi\"")])
            .unwrap()
            .with_row(vec![json!(null), json!(true)])
            .unwrap();
        assert_eq!(
            table.to_csv(),
            "name,note\n\"a,b\",\"say \"\"hi\"\"\"\n,true\n"
        );
    }

    #[test]
    fn blank_headers_become_letters() {
        let table = DataTable::new(["", "value", ""]);
        assert_eq!(table.headers(), vec!["A", "value", "C"]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut table = DataTable::new(["a", "b"]);
        assert!(table.push_row(vec![json!(1)]).is_err());
        assert!(table.rows.is_empty());
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_archive() {
        let table = DataTable::new(["x"]).with_row(vec![json!(1.5)]).unwrap();
        let bytes = table.to_xlsx().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
