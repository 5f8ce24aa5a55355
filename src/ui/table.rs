use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Two-column name/value table
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            name: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a header row plus data rows of arbitrary width
pub fn grid(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_contains_cells() {
        let out = grid(
            &["id".to_string(), "name".to_string()],
            &[vec!["1".to_string(), "pen".to_string()]],
        );
        assert!(out.contains("name"));
        assert!(out.contains("pen"));
        assert_eq!(out.lines().count(), 5);
    }

    #[test]
    fn test_empty_builder() {
        assert_eq!(TableBuilder::new().build(), "");
        let mut builder = TableBuilder::new();
        builder.add_row("price", "REAL");
        assert!(builder.build().contains("REAL"));
    }
}
