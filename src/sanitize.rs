use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Cell, Row};

static DATE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Date\(\s*(-?\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*(\d+)\s*(?:,\s*(\d+)\s*)?(?:,\s*\d+\s*)*)?\)$",
    )
    .expect("date literal pattern is valid")
});

/// Normalises fetched rows: the leading `Date(...)` cell of each row is
/// rewritten first, then every fractional number is rounded to two places.
pub fn sanitize_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(convert_leading_date)
        .map(|row| row.into_iter().map(round_cell).collect())
        .collect()
}

fn convert_leading_date(mut row: Row) -> Row {
    if let Some(Cell::Text(text)) = row.first_mut() {
        if let Some(converted) = convert_date_literal(text) {
            *text = converted;
        }
    }
    row
}

/// `Date(2023,0,15)` becomes `2023-01-15` and `Date(2023,11,1,9,30)` becomes
/// `2023-12-01 09:30`. Months in the literal are zero-based. Text that does
/// not match the literal shape is left alone.
pub fn convert_date_literal(text: &str) -> Option<String> {
    let captures = DATE_LITERAL.captures(text)?;
    let number = |idx: usize| -> Option<i64> { captures.get(idx)?.as_str().parse().ok() };

    let year = captures.get(1)?.as_str();
    let month = number(2)? + 1;
    let day = number(3)?;
    let mut out = format!("{year}-{month:02}-{day:02}");

    if let Some(hour) = number(4) {
        let minute = number(5).unwrap_or(0);
        out.push_str(&format!(" {hour:02}:{minute:02}"));
    }
    Some(out)
}

pub fn round_cell(cell: Cell) -> Cell {
    match cell {
        Cell::Number(value) if value.fract() != 0.0 => Cell::Number(round2(value)),
        other => other,
    }
}

/// Two decimal places, rounded on the exact binary value the way
/// `Number.prototype.toFixed(2)` does, so `2.675` (stored just below) gives
/// `2.67`. Exact ties, the odd multiples of 1/8, go away from zero.
fn round2(value: f64) -> f64 {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return (value * 100.0).round() / 100.0;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn converts_date_only() {
        assert_eq!(convert_date_literal("Date(2023,0,15)").as_deref(), Some("2023-01-15"));
    }

    #[test]
    fn converts_date_with_time() {
        assert_eq!(
            convert_date_literal("Date(2023,11,1,9,30)").as_deref(),
            Some("2023-12-01 09:30")
        );
        assert_eq!(
            convert_date_literal("Date(2024, 1, 29, 23, 5, 59)").as_deref(),
            Some("2024-02-29 23:05")
        );
    }

    #[test]
    fn leaves_other_text() {
        assert_eq!(convert_date_literal("Date of sample"), None);
        assert_eq!(convert_date_literal("2023-01-15"), None);
    }

    #[test]
    fn only_first_cell_is_converted() {
        let rows = vec![vec![text("Date(2023,0,15)"), text("Date(2023,0,16)")]];
        let out = sanitize_rows(rows);
        assert_eq!(out[0][0], text("2023-01-15"));
        assert_eq!(out[0][1], text("Date(2023,0,16)"));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn rounds_fractional_numbers() {
        let rows = vec![vec![Cell::Number(3.14159), Cell::Number(5.0), Cell::Number(-7.126)]];
        let out = sanitize_rows(rows);
        assert_eq!(out[0][0], Cell::Number(3.14));
        assert_eq!(out[0][1], Cell::Number(5.0));
        assert_eq!(out[0][2], Cell::Number(-7.13));
        assert_eq!(out[0][0].to_string(), "3.14");
        assert_eq!(out[0][1].to_string(), "5");
    }

    #[test]
    fn rounds_on_exact_binary_value() {
        let rows = vec![vec![
            Cell::Number(0.015),
            Cell::Number(2.675),
            Cell::Number(0.185),
            Cell::Number(1.005),
        ]];
        let out = sanitize_rows(rows);
        let rendered: Vec<_> = out[0].iter().map(Cell::to_string).collect();
        assert_eq!(rendered, vec!["0.01", "2.67", "0.18", "1"]);
    }

    #[test]
    fn exact_ties_round_away_from_zero() {
        let rows = vec![vec![
            Cell::Number(0.125),
            Cell::Number(-0.125),
            Cell::Number(0.375),
            Cell::Number(2.5),
        ]];
        let out = sanitize_rows(rows);
        assert_eq!(out[0][0], Cell::Number(0.13));
        assert_eq!(out[0][1], Cell::Number(-0.13));
        assert_eq!(out[0][2], Cell::Number(0.38));
        assert_eq!(out[0][3], Cell::Number(2.5));
    }

    #[test]
    fn empty_and_text_cells_untouched() {
        let rows = vec![vec![Cell::Empty, text("3.14159"), Cell::Bool(false)]];
        let out = sanitize_rows(rows.clone());
        assert_eq!(out, rows);
    }
}
