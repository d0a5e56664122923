//! Batch prediction and Recall@k evaluation over CSV files.

use std::{io, path::Path};

use anyhow::{bail, Context};

/// Header names recognised as the query column, compared lowercased and trimmed.
const QUERY_COLUMNS: [&str; 4] = ["query", "question", "jd", "job_description"];
/// A header containing this word holds the expected assessments.
const TRUTH_COLUMN_MARKER: &str = "recommend";
pub const PREDICTION_COLUMN: &str = "recommended_assessments";
const NAME_SEPARATOR: &str = "; ";

/// UTF-8 when valid, Latin-1 otherwise.
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// A CSV file held in memory.
#[derive(Debug, Clone, Default)]
pub struct QueryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryTable {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file =
            std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(file)
    }

    /// Rows that cannot be parsed are skipped with a warning.
    pub fn from_reader<R: io::Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr.byte_headers()?.iter().map(decode_field).collect();
        log::info!("columns found: {headers:?}");

        let mut rows = Vec::new();
        for (line, record) in rdr.byte_records().enumerate() {
            match record {
                Ok(record) => rows.push(record.iter().map(decode_field).collect()),
                Err(err) => log::warn!("skipping row {}: {err}", line + 1),
            }
        }

        Ok(Self { headers, rows })
    }

    /// The first recognised query header, else the first column.
    pub fn query_column(&self) -> anyhow::Result<usize> {
        if self.headers.is_empty() {
            bail!("input has no columns");
        }

        let column = self
            .headers
            .iter()
            .position(|h| QUERY_COLUMNS.contains(&h.trim().to_lowercase().as_str()))
            .unwrap_or(0);

        log::info!("using query column: {}", self.headers[column]);
        Ok(column)
    }

    pub fn truth_column(&self) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.to_lowercase().contains(TRUTH_COLUMN_MARKER))
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or_default()
    }
}

/// Top-k predictions for every row, names joined with `"; "`.
pub fn predict<F>(table: &QueryTable, k: usize, recommend: F) -> anyhow::Result<Vec<String>>
where
    F: Fn(&str, usize) -> anyhow::Result<Vec<String>>,
{
    let column = table.query_column()?;

    (0..table.rows.len())
        .map(|row| -> anyhow::Result<String> {
            Ok(recommend(table.cell(row, column), k)?.join(NAME_SEPARATOR))
        })
        .collect()
}

/// Write the table with an extra prediction column.
pub fn write_predictions<W: io::Write>(
    table: &QueryTable,
    predictions: &[String],
    writer: W,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let mut headers = table.headers.clone();
    headers.push(PREDICTION_COLUMN.to_string());
    wtr.write_record(&headers)?;

    for (row, prediction) in table.rows.iter().zip(predictions) {
        let mut record = row.clone();
        record.resize(table.headers.len(), String::new());
        record.push(prediction.clone());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub k: usize,
    pub hits: usize,
    pub total: usize,
}

impl Evaluation {
    pub fn recall(&self) -> f64 {
        self.hits as f64 / self.total as f64
    }
}

/// Share of rows where at least one expected assessment is predicted.
pub fn evaluate<F>(table: &QueryTable, k: usize, recommend: F) -> anyhow::Result<Evaluation>
where
    F: Fn(&str, usize) -> anyhow::Result<Vec<String>>,
{
    let query_column = table.query_column()?;
    let Some(truth_column) = table.truth_column() else {
        bail!("no ground truth column found");
    };

    if table.rows.is_empty() {
        bail!("no labelled rows to evaluate");
    }

    let mut hits = 0;
    for row in 0..table.rows.len() {
        let expected: Vec<String> = table
            .cell(row, truth_column)
            .split(';')
            .map(|name| name.trim().to_lowercase())
            .collect();

        let predicted: Vec<String> = recommend(table.cell(row, query_column), k)?
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();

        if expected.iter().any(|name| predicted.contains(name)) {
            hits += 1;
        }
    }

    Ok(Evaluation {
        k,
        hits,
        total: table.rows.len(),
    })
}
