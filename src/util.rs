use std::io::{self, Write};

use tabwriter::TabWriter;
use tmdb_analysis::{Table, Value};

/// How a result table is rendered on stdout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// Aligned columns for reading in a terminal.
    Text,
    /// CSV with a header row.
    Csv,
}

/// Write a titled section to the given writer.
///
/// In text mode the title is printed on its own line above the table. CSV
/// output carries no titles; consecutive tables are separated by a blank
/// line.
pub fn write_section<W: io::Write>(
    mut wtr: W,
    format: Format,
    title: &str,
    table: &Table,
) -> anyhow::Result<()> {
    match format {
        Format::Text => writeln!(wtr, "{}", title)?,
        Format::Csv => {}
    }
    write_table(&mut wtr, format, table)?;
    writeln!(wtr)?;
    Ok(())
}

/// Write the given table in the given format.
pub fn write_table<W: io::Write>(
    wtr: W,
    format: Format,
    table: &Table,
) -> anyhow::Result<()> {
    match format {
        Format::Csv => table.write_csv(wtr)?,
        Format::Text => write_tsv(wtr, table)?,
    }
    Ok(())
}

/// Write the given table as aligned, tab separated columns.
///
/// Unknown values are shown as `N/A` and floats are rounded to two decimal
/// places. An empty table is reported as such instead of printing a lone
/// header.
fn write_tsv<W: io::Write>(wtr: W, table: &Table) -> anyhow::Result<()> {
    let mut wtr = TabWriter::new(wtr).minwidth(4);
    if table.is_empty() {
        writeln!(wtr, "no results")?;
        wtr.flush()?;
        return Ok(());
    }
    writeln!(wtr, "{}", table.columns().join("\t"))?;
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(cell).collect();
        writeln!(wtr, "{}", cells.join("\t"))?;
    }
    wtr.flush()?;
    Ok(())
}

fn cell(value: &Value) -> String {
    match *value {
        Value::Null => "N/A".to_string(),
        Value::Float(n) => format!("{:0.2}", n),
        ref v => v.to_string(),
    }
}
