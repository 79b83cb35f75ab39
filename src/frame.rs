//! Untyped raw rows as read from a source folder.
//!
//! A [`RawTable`] only exists between loading and the per-source cleaner;
//! everything downstream works on typed records.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = RawTable::default();
        let headers = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        table.append(&headers, rows);
        table
    }

    /// Appends rows read under `headers`. Columns unknown so far are added
    /// (earlier rows get an absent cell); known columns missing from
    /// `headers` are absent in the new rows. Empty cells are absent.
    pub fn append(&mut self, headers: &[String], rows: Vec<Vec<String>>) {
        let mut mapping = Vec::with_capacity(headers.len());
        for header in headers {
            let position = match self.positions.get(header) {
                Some(position) => *position,
                None => {
                    let position = self.headers.len();
                    self.headers.push(header.clone());
                    self.positions.insert(header.clone(), position);
                    for row in &mut self.rows {
                        row.push(None);
                    }
                    position
                }
            };
            mapping.push(position);
        }
        let width = self.headers.len();
        for record in rows {
            let mut row = vec![None; width];
            for (cell, position) in record.into_iter().zip(mapping.iter()) {
                if !cell.is_empty() {
                    row[*position] = Some(cell);
                }
            }
            self.rows.push(row);
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes the listed columns that exist and returns how many were removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !names.contains(&header.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        let removed = self.headers.len() - keep.len();
        if removed == 0 {
            return 0;
        }
        let headers: Vec<String> = keep.iter().map(|idx| self.headers[*idx].clone()).collect();
        self.headers = headers;
        self.positions = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), idx))
            .collect();
        for row in &mut self.rows {
            let kept: Vec<Option<String>> = keep.iter().map(|idx| row[*idx].take()).collect();
            *row = kept;
        }
        removed
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |cells| RawRow {
            positions: &self.positions,
            cells,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    positions: &'a HashMap<String, usize>,
    cells: &'a [Option<String>],
}

impl<'a> RawRow<'a> {
    /// Returns the cell under `column`, or `None` when the column does not
    /// exist or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let position = *self.positions.get(column)?;
        self.cells.get(position)?.as_deref()
    }

    /// Like [`RawRow::get`] but whitespace-only cells also count as absent.
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_unions_headers_across_files() {
        let mut table = RawTable::default();
        table.append(
            &["id".to_string(), "title".to_string()],
            vec![vec!["1".into(), "Alien".into()]],
        );
        table.append(
            &["title".to_string(), "year".to_string()],
            vec![vec!["Heat".into(), "1995".into()]],
        );
        assert_eq!(table.headers(), ["id", "title", "year"]);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("year"), None);
        assert_eq!(rows[1].get("id"), None);
        assert_eq!(rows[1].get("title"), Some("Heat"));
    }

    #[test]
    fn drop_columns_ignores_unknown_names() {
        let mut table = RawTable::from_rows(&["a", "b", "c"], &[&["1", "2", "3"]]);
        assert_eq!(table.drop_columns(&["b", "missing"]), 1);
        assert_eq!(table.headers(), ["a", "c"]);
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("c"), Some("3"));
        assert_eq!(row.get("b"), None);
    }

    #[test]
    fn blank_cells_are_absent() {
        let table = RawTable::from_rows(&["title"], &[&[""], &["   "]]);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("title"), None);
        assert_eq!(rows[1].get("title"), Some("   "));
        assert_eq!(rows[1].text("title"), None);
    }
}
