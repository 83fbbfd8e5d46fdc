//! Titled tables for command output

use prettytable::{Cell, Row, Table, format::consts::FORMAT_NO_LINESEP_WITH_TITLE};
use std::fmt::Display;

/// A table whose rows are built from anything printable
pub struct ListTable(Table);

impl ListTable {
    pub fn new(headers: &[&str]) -> Self {
        let mut table = Table::new();
        table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
        let titles = headers.iter().map(|h| Cell::new(h).style_spec("b")).collect();
        table.set_titles(Row::new(titles));
        Self(table)
    }

    pub fn push<I>(&mut self, cells: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let row: Vec<Cell> = cells.into_iter().map(|c| Cell::new(&c.to_string())).collect();
        self.0.add_row(Row::new(row));
    }

    pub fn print(&self) {
        self.0.printstd();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_accept_mixed_cells() {
        let mut table = ListTable::new(&["#", "Name"]);
        table.push([1.to_string(), "tag_head".to_string()]);
        table.push(["2", "tag_weapon"]);
        let text = table.0.to_string();
        assert!(text.contains("tag_head"));
        assert!(text.contains("tag_weapon"));
        assert_eq!(table.0.len(), 2);
    }
}
