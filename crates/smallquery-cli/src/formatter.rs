//! Output rendering for query results.
//!
//! Results go either to the terminal as a table or to a CSV file. Both
//! renderers report their own failures and return `false` instead of
//! propagating them.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, ColumnConstraint, ContentArrangement, Table, Width};

use smallquery_client::{ResultSet, Value};

/// Narrowest a table column is allowed to shrink to.
const MIN_COLUMN_WIDTH: u16 = 6;

/// CSV field separator.
const CSV_DELIMITER: &str = ",";

/// CSV quote character.
const CSV_QUOTE: char = '|';

/// Formats the result as a table.
pub fn format_table(result: &ResultSet) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    // Add header row
    if !result.column_names.is_empty() {
        table.set_header(
            result
                .column_names
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );
    }

    // Add data rows
    for row in &result.rows {
        let cells: Vec<Cell> = row
            .iter()
            .map(|v| {
                Cell::new(v.to_string())
                    .fg(Color::Yellow)
                    .add_attribute(Attribute::Bold)
            })
            .collect();
        table.add_row(cells);
    }

    table.set_constraints(
        (0..result.column_count())
            .map(|_| ColumnConstraint::LowerBoundary(Width::Fixed(MIN_COLUMN_WIDTH))),
    );

    table.to_string()
}

/// Prints the result as a table titled "Query Results".
pub fn render_table(result: &ResultSet) -> bool {
    let output = format!("{}\n{}", "Query Results".italic(), format_table(result));
    match writeln!(io::stdout().lock(), "{}", output) {
        Ok(()) => true,
        Err(e) => {
            report_error(&format!("Error writing to stdout: {}", e));
            false
        }
    }
}

/// Formats the result as CSV: a header row, then one row per result row.
pub fn format_csv(result: &ResultSet) -> String {
    let mut output = String::new();

    let header: Vec<String> = result.column_names.iter().map(|c| escape_csv(c)).collect();
    output.push_str(&header.join(CSV_DELIMITER));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = row.iter().map(csv_field).collect();
        output.push_str(&values.join(CSV_DELIMITER));
        output.push('\n');
    }

    output
}

/// Writes the result to `path` as CSV.
pub fn render_csv(result: &ResultSet, path: &Path) -> bool {
    match write_csv(result, path) {
        Ok(()) => {
            println!(
                "{}",
                format!("Output written to {}", path.display()).green().bold()
            );
            true
        }
        Err(e) => {
            report_error(&format!("Unable to write file ({}): {}", path.display(), e));
            false
        }
    }
}

fn write_csv(result: &ResultSet, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_csv(result).as_bytes())?;
    writer.flush()
}

/// Formats the execution time line printed after a rendered result.
///
/// Whole numbers keep their fractional digit, so 2 ms reads `2.0ms`.
pub fn format_timing(query_ms: f64) -> String {
    format!("Query execution time: {:?}ms", query_ms)
}

/// Prints an error message in red.
pub fn report_error(message: &str) {
    eprintln!("{}", message.red().bold());
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => escape_csv(&other.to_string()),
    }
}

/// Quotes a field only when it contains the delimiter, the quote character
/// or a line break.
fn escape_csv(value: &str) -> String {
    if value.contains(CSV_DELIMITER)
        || value.contains(CSV_QUOTE)
        || value.contains('\n')
        || value.contains('\r')
    {
        let doubled = format!("{CSV_QUOTE}{CSV_QUOTE}");
        format!(
            "{CSV_QUOTE}{}{CSV_QUOTE}",
            value.replace(CSV_QUOTE, &doubled)
        )
    } else {
        value.to_string()
    }
}
