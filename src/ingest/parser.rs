use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Xls, Xlsx};

use crate::error::ParseError;
use crate::models::CandidateRecord;

const FIRST_NAME_HEADER: &str = "FirstName";
const PHONE_HEADER: &str = "Phone";
const NOTES_HEADER: &str = "Notes";

/// Tabular formats accepted for upload, chosen from the declared file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SourceFormat {
    /// Picks the format from the file extension. The content is never sniffed.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// Parses a payload into candidate records in source row order.
pub fn parse(payload: &[u8], format: SourceFormat) -> Result<Vec<CandidateRecord>, ParseError> {
    match format {
        SourceFormat::Csv => parse_csv(payload),
        SourceFormat::Xlsx => {
            let workbook: Xlsx<_> =
                Xlsx::new(Cursor::new(payload)).map_err(calamine::Error::from)?;
            parse_workbook(workbook)
        }
        SourceFormat::Xls => {
            let workbook: Xls<_> = Xls::new(Cursor::new(payload)).map_err(calamine::Error::from)?;
            parse_workbook(workbook)
        }
    }
}

fn parse_csv<R: Read>(reader: R) -> Result<Vec<CandidateRecord>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.byte_headers()?.iter().map(lossy_text).collect();
    if headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }
    let columns = ColumnMap::from_headers(headers.iter().map(String::as_str));

    let mut records = Vec::new();
    for row in csv_reader.byte_records() {
        let row = row?;
        records.push(columns.record(|index| row.get(index).map(lossy_text).unwrap_or_default()));
    }

    Ok(records)
}

/// Decodes a CSV field, replacing invalid UTF-8 with U+FFFD.
fn lossy_text(field: &[u8]) -> String {
    String::from_utf8_lossy(field).trim().to_string()
}

/// Column positions of the recognized headers. The first matching column wins.
#[derive(Debug, Default)]
struct ColumnMap {
    first_name: Option<usize>,
    phone: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::default();
        for (index, header) in headers.into_iter().enumerate() {
            match header.trim_start_matches('\u{feff}') {
                FIRST_NAME_HEADER => map.first_name = map.first_name.or(Some(index)),
                PHONE_HEADER => map.phone = map.phone.or(Some(index)),
                NOTES_HEADER => map.notes = map.notes.or(Some(index)),
                _ => {}
            }
        }
        map
    }

    /// Builds a record, reading each mapped column through `cell`.
    fn record(&self, cell: impl Fn(usize) -> String) -> CandidateRecord {
        let column = |index: Option<usize>| index.map(&cell).unwrap_or_default();

        CandidateRecord {
            first_name: column(self.first_name),
            phone: column(self.phone),
            notes: column(self.notes),
        }
    }
}

/// Renders any cell as trimmed text; numbers and dates use their display form.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn parse_workbook<W, RS>(mut workbook: W) -> Result<Vec<CandidateRecord>, ParseError>
where
    W: Reader<RS>,
    RS: Read + Seek,
    calamine::Error: From<W::Error>,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoSheet)?
        .map_err(calamine::Error::from)?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(ParseError::MissingHeader)?
        .iter()
        .map(cell_text)
        .collect();
    let columns = ColumnMap::from_headers(header.iter().map(String::as_str));

    Ok(rows
        .map(|row| columns.record(|index| row.get(index).map(cell_text).unwrap_or_default()))
        .collect())
}
