//! CSV reading, writing and encoding helpers.
//!
//! All raw-folder and artifact I/O goes through this module:
//!
//! - **Folder loading**: every `*.csv` in a source folder is read in
//!   lexicographic order and stacked into one [`RawTable`] (schema union).
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8. A
//!   leading byte-order mark is dropped from the first header.
//! - **Artifacts**: writers for the standardized per-source CSV files.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{PipelineError, PipelineResult},
    frame::RawTable,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> PipelineResult<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| PipelineError::Config(format!("Unknown encoding '{value}'"))),
        None => Ok(UTF_8),
    }
}

pub fn open_csv_reader<R>(reader: R, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(DEFAULT_CSV_DELIMITER)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path) -> PipelineResult<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|err| PipelineError::io(path, err))?;
    Ok(open_csv_reader(BufReader::new(file), true))
}

pub fn open_csv_writer(path: &Path) -> PipelineResult<csv::Writer<Box<dyn Write>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
    }
    let file = File::create(path).map_err(|err| PipelineError::io(path, err))?;
    let writer: Box<dyn Write> = Box::new(BufWriter::new(file));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    path: &Path,
    row: usize,
) -> PipelineResult<Vec<String>> {
    record
        .iter()
        .map(|field| {
            decode_bytes(field, encoding).ok_or_else(|| PipelineError::Decode {
                path: path.to_path_buf(),
                row,
                encoding: encoding.name(),
            })
        })
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
    path: &Path,
) -> PipelineResult<Vec<String>>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|err| PipelineError::csv(path, err))?
        .clone();
    let mut decoded = decode_record(&headers, encoding, path, 1)?;
    if let Some(first) = decoded.first_mut()
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        *first = stripped.to_string();
    }
    Ok(decoded.into_iter().map(|h| h.trim().to_string()).collect())
}

/// Lists the `*.csv` files of `folder` in lexicographic order.
pub fn list_csv_files(folder: &Path) -> PipelineResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|err| PipelineError::io(folder, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(folder, err))?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads one CSV file and appends it to `table`, widening the schema as needed.
pub fn append_csv_file(
    table: &mut RawTable,
    path: &Path,
    encoding: &'static Encoding,
) -> PipelineResult<usize> {
    let mut reader = open_csv_reader_from_path(path)?;
    let headers = reader_headers(&mut reader, encoding, path)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|err| PipelineError::csv(path, err))?;
        rows.push(decode_record(&record, encoding, path, row_idx + 2)?);
    }
    let count = rows.len();
    table.append(&headers, rows);
    debug!("Read {count} row(s) from {path:?}");
    Ok(count)
}

/// Loads and stacks every CSV file in `folder` into a single table.
pub fn load_stacked_csvs(folder: &Path, encoding: &'static Encoding) -> PipelineResult<RawTable> {
    let mut table = RawTable::default();
    for path in list_csv_files(folder)? {
        append_csv_file(&mut table, &path, encoding)?;
    }
    Ok(table)
}
