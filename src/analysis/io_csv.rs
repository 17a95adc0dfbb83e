// Primitives for reading and writing CSV tables.

use crate::analysis::*;

pub fn write_table(path: &Path, table: &Table) -> CliResult<()> {
    let p = path.display().to_string();
    info!("Writing table {:?}", p);
    let mut wtr = csv::Writer::from_path(path).context(CsvSnafu { path: p.clone() })?;
    write_rows(&mut wtr, table).context(CsvSnafu { path: p.clone() })?;
    wtr.flush().context(WritingFileSnafu { path: p })?;
    Ok(())
}

/// The table as it would be written to disk.
pub fn table_to_string(table: &Table) -> CliResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    write_rows(&mut wtr, table).context(CsvSnafu { path: "<memory>" })?;
    let bytes = match wtr.into_inner() {
        Ok(b) => b,
        Err(e) => {
            whatever!("Could not render table: {}", e.error())
        }
    };
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            whatever!("Table is not valid UTF-8: {}", e)
        }
    }
}

/// Reads a table written by `write_table`. The first row holds the headers.
pub fn read_table(path: &Path) -> CliResult<Table> {
    let p = path.display().to_string();
    debug!("Reading table {:?}", p);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvSnafu { path: p.clone() })?;
    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(line_r) => {
            let line = line_r.context(CsvSnafu { path: p.clone() })?;
            line.iter().map(|s| s.to_string()).collect()
        }
        None => Vec::new(),
    };
    let mut rows: Vec<Vec<String>> = Vec::new();
    for line_r in records {
        let line = line_r.context(CsvSnafu { path: p.clone() })?;
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    Ok(Table { headers, rows })
}

fn write_rows<W: std::io::Write>(wtr: &mut csv::Writer<W>, table: &Table) -> csv::Result<()> {
    wtr.write_record(&table.headers)?;
    for row in table.rows.iter() {
        wtr.write_record(row)?;
    }
    Ok(())
}
