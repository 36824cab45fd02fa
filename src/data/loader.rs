use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use arrow::array::{Array, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use clap::ValueEnum;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::RawTable;
use crate::error::{AnalysisError, Result};

/// Path that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

/// On-disk layout of a benchmark table.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// Pick by file extension; whitespace text for anything unrecognised.
    #[default]
    Auto,
    /// Whitespace-separated columns, one row per line
    Text,
    /// Comma-separated columns without a header row
    Csv,
    /// Top-level JSON array of numeric arrays
    Json,
    /// Parquet file with numeric columns
    Parquet,
}

impl InputFormat {
    /// Resolve `Auto` against the extension of `path`.
    pub fn resolve(self, path: &Path) -> InputFormat {
        if self != InputFormat::Auto {
            return self;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => InputFormat::Csv,
            "json" => InputFormat::Json,
            "parquet" | "pq" => InputFormat::Parquet,
            _ => InputFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a benchmark table from `path` (or stdin for `-`).
///
/// Supported formats:
/// * whitespace text – the benchmark's native dump, `#` comments and blank lines skipped
/// * `.csv`          – same table, comma-separated, no header
/// * `.json`         – `[[0, 10.0, 12.0], [1, 5.0, 9.0], ...]`
/// * `.parquet`      – one numeric column per table column
pub fn load_file(path: &Path, format: InputFormat) -> Result<RawTable> {
    let format = format.resolve(path);
    let table = if path.as_os_str() == STDIN_PATH {
        load_reader(io::stdin().lock(), format)?
    } else if format == InputFormat::Parquet {
        load_parquet(File::open(path)?)?
    } else {
        load_reader(BufReader::new(File::open(path)?), format)?
    };

    log::info!(
        "Loaded {} rows x {} columns from {} ({format:?})",
        table.len(),
        table.columns(),
        path.display()
    );
    Ok(table)
}

/// Load a table from any buffered reader.  Parquet needs random access and is
/// only accepted through [`load_file`].
pub fn load_reader<R: BufRead>(reader: R, format: InputFormat) -> Result<RawTable> {
    match format {
        InputFormat::Auto | InputFormat::Text => load_text(reader),
        InputFormat::Csv => load_csv(reader),
        InputFormat::Json => load_json(reader),
        InputFormat::Parquet => Err(AnalysisError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "parquet input must be a seekable file, not a stream",
        ))),
    }
}

// ---------------------------------------------------------------------------
// Shape checking shared by every format
// ---------------------------------------------------------------------------

/// Accumulates rows, pinning the column count to the first row seen.
#[derive(Default)]
struct RowCollector {
    rows: Vec<Vec<f64>>,
    expected: Option<usize>,
}

impl RowCollector {
    fn check_width(&mut self, line: usize, actual: usize) -> Result<()> {
        match self.expected {
            Some(expected) if expected != actual => Err(AnalysisError::MalformedInput {
                line,
                expected,
                actual,
            }),
            Some(_) => Ok(()),
            None => {
                self.expected = Some(actual);
                Ok(())
            }
        }
    }

    fn push_tokens(&mut self, line: usize, tokens: &[&str]) -> Result<()> {
        self.check_width(line, tokens.len())?;
        let row = tokens
            .iter()
            .enumerate()
            .map(|(j, tok)| parse_field(line, j + 1, tok))
            .collect::<Result<Vec<f64>>>()?;
        self.rows.push(row);
        Ok(())
    }

    fn finish(self) -> Result<RawTable> {
        RawTable::from_rows(self.rows)
    }
}

fn parse_field(line: usize, field: usize, tok: &str) -> Result<f64> {
    let invalid = || AnalysisError::InvalidNumber {
        line,
        field,
        value: tok.to_string(),
    };
    let value = tok.trim().parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Whitespace text loader
// ---------------------------------------------------------------------------

/// Everything after a `#` is a comment; lines left empty are skipped.
fn load_text<R: BufRead>(mut reader: R) -> Result<RawTable> {
    let mut collector = RowCollector::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = decode_line(line_no, &buf)?;
        let data = line.split_once('#').map_or(line, |(data, _)| data);
        let tokens: Vec<&str> = data.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        collector.push_tokens(line_no, &tokens)?;
    }

    collector.finish()
}

/// UTF-8 view of one raw line.  Invalid bytes are reported against the
/// whitespace-separated field that contains them.
fn decode_line(line: usize, bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| {
        let fields = bytes
            .split(|b| b.is_ascii_whitespace())
            .filter(|tok| !tok.is_empty());
        let (field, value) = fields
            .enumerate()
            .find(|(_, tok)| std::str::from_utf8(tok).is_err())
            .map(|(j, tok)| (j + 1, String::from_utf8_lossy(tok).into_owned()))
            .unwrap_or_else(|| (1, String::from_utf8_lossy(bytes).trim().to_string()));
        AnalysisError::InvalidNumber { line, field, value }
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Headerless CSV; `#` comment lines are skipped like in the text format.
fn load_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut collector = RowCollector::default();

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(row_no + 1);
        let tokens: Vec<&str> = record.iter().collect();
        collector.push_tokens(line, &tokens)?;
    }

    collector.finish()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema, one inner array per row:
///
/// ```json
/// [
///   [0, 1200.5, 1203.1, 1210.0, 1215.2],
///   [1, 1201.0, 1204.4, 1209.9, 1216.0]
/// ]
/// ```
///
/// Row numbers in errors are 1-based positions in the outer array.
fn load_json<R: Read>(reader: R) -> Result<RawTable> {
    let records: Vec<Vec<JsonValue>> = serde_json::from_reader(reader)?;
    let mut collector = RowCollector::default();

    for (i, record) in records.iter().enumerate() {
        let line = i + 1;
        collector.check_width(line, record.len())?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, v)| {
                v.as_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| AnalysisError::InvalidNumber {
                        line,
                        field: j + 1,
                        value: v.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>>>()?;
        collector.rows.push(row);
    }

    collector.finish()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file whose columns are the table columns, in schema order.
///
/// Integer and float columns are cast to `Float64`.  Nulls, and cells a
/// string column cannot be cast from, are reported as invalid numbers with
/// the 1-based row number as the line.
fn load_parquet(file: File) -> Result<RawTable> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut collector = RowCollector::default();
    let mut row_offset = 0usize;

    for batch_result in reader {
        let batch = batch_result?;
        let columns = batch
            .columns()
            .iter()
            .map(|col| cast(col, &DataType::Float64))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let columns: Vec<Float64Array> = columns
            .iter()
            .map(|col| col.as_primitive::<Float64Type>().clone())
            .collect();

        for row in 0..batch.num_rows() {
            let line = row_offset + row + 1;
            collector.check_width(line, columns.len())?;

            let mut values = Vec::with_capacity(columns.len());
            for (j, col) in columns.iter().enumerate() {
                let invalid = |value: String| AnalysisError::InvalidNumber {
                    line,
                    field: j + 1,
                    value,
                };
                if col.is_null(row) {
                    return Err(invalid("null".to_string()));
                }
                let v = col.value(row);
                if !v.is_finite() {
                    return Err(invalid(v.to_string()));
                }
                values.push(v);
            }
            collector.rows.push(values);
        }
        row_offset += batch.num_rows();
    }

    collector.finish()
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn text(input: &str) -> Result<RawTable> {
        load_reader(Cursor::new(input), InputFormat::Text)
    }

    #[test]
    fn parses_whitespace_runs() {
        let table = text("0  10.0\t12.0\n0 20.0   19.0\n1 5 9\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), 3);
        assert_eq!(table.rows()[1], vec![0.0, 20.0, 19.0]);
    }

    #[test]
    fn empty_input_is_no_data() {
        assert!(matches!(text(""), Err(AnalysisError::NoData)));
        assert!(matches!(text("\n  \n# only a comment\n"), Err(AnalysisError::NoData)));
    }

    #[test]
    fn short_row_names_its_line() {
        let input = "0 1 2 3 4\n0 1 2 3 4\n0 1 2\n0 1 2 3 4\n";
        match text(input) {
            Err(AnalysisError::MalformedInput { line, expected, actual }) => {
                assert_eq!((line, expected, actual), (3, 5, 3));
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn line_numbers_count_skipped_lines() {
        let input = "# core send recv\n0 1 2\n\n0 1\n";
        assert!(matches!(
            text(input),
            Err(AnalysisError::MalformedInput { line: 4, .. })
        ));
    }

    #[test]
    fn bad_number_names_line_and_field() {
        match text("0 1 2\n0 x 2\n") {
            Err(AnalysisError::InvalidNumber { line, field, value }) => {
                assert_eq!((line, field, value.as_str()), (2, 2, "x"));
            }
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
        assert!(matches!(text("0 nan 2\n"), Err(AnalysisError::InvalidNumber { .. })));
    }

    #[test]
    fn trailing_comments_are_stripped() {
        let table = text("0 1 2 # warm-up\n1 3 4#no space\n   # indented comment\n").unwrap();
        assert_eq!(table.rows(), &[vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 4.0]]);
    }

    #[test]
    fn invalid_utf8_names_line_and_field() {
        let input: &[u8] = b"0 1 2\n0 1 2\n0 \xff 2\n";
        match load_reader(Cursor::new(input), InputFormat::Text) {
            Err(err @ AnalysisError::InvalidNumber { .. }) => {
                assert!(err.to_string().starts_with("line 3, field 2:"), "{err}");
            }
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn crlf_line_endings() {
        let table = text("0 1 2\r\n1 3 4\r\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn csv_matches_text() {
        let csv = load_reader(Cursor::new("0,10.0,12.0\n1, 5.0, 9.0\n"), InputFormat::Csv).unwrap();
        let txt = text("0 10.0 12.0\n1 5.0 9.0\n").unwrap();
        assert_eq!(csv, txt);
    }

    #[test]
    fn csv_short_row() {
        let res = load_reader(Cursor::new("0,1,2\n0,1\n"), InputFormat::Csv);
        assert!(matches!(
            res,
            Err(AnalysisError::MalformedInput { line: 2, expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn json_rows() {
        let table =
            load_reader(Cursor::new("[[0, 10.0, 12.0], [1, 5, 9]]"), InputFormat::Json).unwrap();
        assert_eq!(table.rows()[1], vec![1.0, 5.0, 9.0]);

        let res = load_reader(Cursor::new(r#"[[0, 1], [0, "a"]]"#), InputFormat::Json);
        assert!(matches!(res, Err(AnalysisError::InvalidNumber { line: 2, field: 2, .. })));

        let res = load_reader(Cursor::new("[]"), InputFormat::Json);
        assert!(matches!(res, Err(AnalysisError::NoData)));
    }

    #[test]
    fn auto_format_by_extension() {
        assert_eq!(InputFormat::Auto.resolve(Path::new("a.CSV")), InputFormat::Csv);
        assert_eq!(InputFormat::Auto.resolve(Path::new("a.pq")), InputFormat::Parquet);
        assert_eq!(InputFormat::Auto.resolve(Path::new("latency.txt")), InputFormat::Text);
        assert_eq!(InputFormat::Auto.resolve(Path::new("dump")), InputFormat::Text);
        assert_eq!(InputFormat::Json.resolve(Path::new("a.csv")), InputFormat::Json);
    }

    #[test]
    fn text_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 10.0 12.0").unwrap();
        writeln!(file, "1 5.0 9.0").unwrap();
        let table = load_file(file.path(), InputFormat::Auto).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn parquet_columns_become_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("core", DataType::Int64, false),
            Field::new("send", DataType::Float64, false),
            Field::new("recv", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![0, 1])),
                Arc::new(Float64Array::from(vec![10.0, 5.0])),
                Arc::new(Float64Array::from(vec![12.0, 9.0])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path, InputFormat::Auto).unwrap();
        assert_eq!(table.columns(), 3);
        assert_eq!(table.rows(), &[vec![0.0, 10.0, 12.0], vec![1.0, 5.0, 9.0]]);
    }
}
