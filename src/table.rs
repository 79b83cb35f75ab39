use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders an aligned text table. Numeric cells are right-aligned; a column
/// is numeric when every non-empty cell in it is.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    let mut numeric = vec![true; column_count];

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
            if !cell.is_empty() && !is_numeric(cell) {
                numeric[idx] = false;
            }
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths, &numeric));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(
        output,
        "{}",
        format_row(&separator, &widths, &vec![false; column_count])
    );
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Whole currency units with thousands separators; absent renders empty.
pub fn format_amount(value: Option<i64>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn is_numeric(cell: &str) -> bool {
    let stripped = cell.replace(',', "");
    stripped.parse::<f64>().is_ok()
}

fn format_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(display_width(&sanitized));
        let pad = " ".repeat(padding);
        if right_align.get(idx).copied().unwrap_or(false) {
            cells.push(format!("{pad}{sanitized}"));
        } else {
            cells.push(format!("{sanitized}{pad}"));
        }
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_are_right_aligned() {
        let rendered = render_table(
            &["title", "budget"],
            &[
                vec!["Heat".into(), format_amount(Some(60_000_000))],
                vec!["Alien".into(), format_amount(Some(11_000_000))],
                vec!["Brazil".into(), String::new()],
            ],
        );
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "title       budget");
        assert_eq!(lines[1], "------  ----------");
        assert_eq!(lines[2], "Heat    60,000,000");
        assert_eq!(lines[4], "Brazil");
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(Some(0)), "0");
        assert_eq!(format_amount(Some(1_234)), "1,234");
        assert_eq!(format_amount(Some(2_923_706_026)), "2,923,706,026");
        assert_eq!(format_amount(None), "");
    }
}
