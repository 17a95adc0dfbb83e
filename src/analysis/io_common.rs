use crate::analysis::*;

use std::fs;
use std::path::PathBuf;

pub fn output_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, extension))
}

pub fn ensure_dir(dir: &Path) -> CliResult<()> {
    fs::create_dir_all(dir).context(WritingFileSnafu {
        path: dir.display().to_string(),
    })
}

/// Clears the first cell of each row that repeats the row above, so that
/// each group is only named on its first row.
pub fn blank_repeated_first_column(table: &Table) -> Table {
    let mut previous: Option<&String> = None;
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(table.rows.len());
    for row in table.rows.iter() {
        let mut cells = row.clone();
        if let Some(first) = row.first() {
            if previous == Some(first) {
                cells[0] = String::new();
            }
            previous = Some(first);
        }
        rows.push(cells);
    }
    Table {
        headers: table.headers.clone(),
        rows,
    }
}
