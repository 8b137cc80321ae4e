//! Output formatting utilities

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Serialize as pretty JSON
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Render rows under a header with left-aligned, padded columns
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.to_vec())];
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(render(separator.iter().map(String::as_str).collect()));
    for row in rows {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Table);
    }

    #[test]
    fn test_table_pads_columns() {
        let table = format_table(&["id", "label"], &[vec!["alice".into(), "person".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id     label");
        assert_eq!(lines[1], "-----  ------");
        assert_eq!(lines[2], "alice  person");
    }

    #[test]
    fn test_table_measures_headers_in_chars() {
        let table = format_table(&["名前", "age"], &[vec!["bo".into(), "7".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "名前  age");
        assert_eq!(lines[1], "--  ---");
        assert_eq!(lines[2], "bo  7");
    }
}
