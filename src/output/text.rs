use std::io::{self, Write};

use crate::error::AppResult;

pub fn print_line(line: &str) -> AppResult<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}

/// Prints rows as left-aligned columns. The last column is never padded.
pub fn print_table(header: &[&str], rows: &[Vec<String>]) -> AppResult<()> {
    let mut stdout = io::stdout().lock();
    for line in render_table(header, rows) {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths = header
        .iter()
        .map(|cell| cell.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (column, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(column) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }

    let header = header.iter().map(|cell| cell.to_string()).collect::<Vec<_>>();
    std::iter::once(&header)
        .chain(rows.iter())
        .map(|row| {
            let last = row.len().saturating_sub(1);
            row.iter()
                .enumerate()
                .map(|(column, cell)| {
                    if column == last {
                        cell.clone()
                    } else {
                        format!("{cell:<width$}", width = widths[column])
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Shortens `value` to at most `max` characters, marking the cut with `...`.
pub fn truncate(value: &str, max: usize) -> String {
    let compact = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max {
        return compact;
    }

    let kept = compact.chars().take(max.saturating_sub(3)).collect::<String>();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_columns() {
        let lines = render_table(
            &["ID", "FROM", "SUBJECT"],
            &[
                vec!["1".to_string(), "Ada".to_string(), "Hi".to_string()],
                vec!["12".to_string(), "Grace Hopper".to_string(), "Re: Hi".to_string()],
            ],
        );
        assert_eq!(
            lines,
            vec![
                "ID  FROM          SUBJECT",
                "1   Ada           Hi",
                "12  Grace Hopper  Re: Hi",
            ]
        );
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Café  au   lait ordinaire", 10), "Café au...");
    }
}
