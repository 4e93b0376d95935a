use serde::Serialize;

/// Widest a table cell may get before it is cut with "...".
const MAX_CELL: usize = 60;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(|c| clip(&c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    print_row(headers, &widths);
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    print_row(&sep, &widths);
    for row in &rows {
        print_row(row, &widths);
    }
}

fn print_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:w$}", cell.as_ref()))
        .collect();
    println!("{}", line.join("  ").trim_end());
}

/// One line, at most `MAX_CELL` characters.
fn clip(cell: &str) -> String {
    let line = cell.lines().next().unwrap_or("");
    match line.char_indices().nth(MAX_CELL) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_first_line_and_caps_length() {
        assert_eq!(clip("short"), "short");
        assert_eq!(clip("first\nsecond"), "first");
        let long = "y".repeat(MAX_CELL + 10);
        assert_eq!(clip(&long).chars().count(), MAX_CELL + 3);
    }
}
