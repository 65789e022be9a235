//! Turn an uploaded spreadsheet into voter records.
//!
//! The first row is a header. Columns are located by substring match on the
//! lower-cased, trimmed header text, so "ID Votante" or "Apellido Paterno"
//! are recognised. Data rows lacking an ID or a first name are skipped.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, DataType, Reader};
use thiserror::Error;

use crate::model::common::VoterRecord;

const ID_HEADER: &str = "id";
const FIRST_NAME_HEADER: &str = "nombre";
const LAST_NAME_HEADER: &str = "apellido";

/// UTF-8 byte order mark, as written by some spreadsheet exporters.
const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("The file contains no voter rows")]
    EmptyFile,
    #[error("Header must have columns containing \"id\", \"nombre\" and \"apellido\"; missing {missing:?}")]
    MissingColumns { missing: Vec<&'static str> },
    #[error("No row has both an id and a first name")]
    NoValidRows,
    #[error("Unsupported file type: {0:?}")]
    UnsupportedFormat(String),
    #[error("The workbook has no worksheets")]
    NoWorksheet,
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// How the uploaded bytes should be decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Comma separated text.
    Csv,
    /// Any workbook format calamine can sniff (`.xlsx`, `.xls`, `.xlsb`, `.ods`).
    Workbook,
}

impl SpreadsheetFormat {
    /// Choose the decoder from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self, SpreadsheetError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Workbook),
            _ => Err(SpreadsheetError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Positions of the required columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColumnIndices {
    pub id: usize,
    pub first_name: usize,
    pub last_name: usize,
}

/// The outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Accepted voters, in row order.
    pub voters: Vec<VoterRecord>,
    /// Data rows dropped for lacking an ID or a first name.
    pub skipped: usize,
}

/// Locate the ID, first-name and last-name columns. The first header
/// containing each keyword wins.
pub fn resolve_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnIndices, SpreadsheetError> {
    let normalised: Vec<String> = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .collect();
    let find = |keyword: &str| normalised.iter().position(|h| h.contains(keyword));

    match (
        find(ID_HEADER),
        find(FIRST_NAME_HEADER),
        find(LAST_NAME_HEADER),
    ) {
        (Some(id), Some(first_name), Some(last_name)) => Ok(ColumnIndices {
            id,
            first_name,
            last_name,
        }),
        (id, first_name, last_name) => {
            let missing = [
                (id, ID_HEADER),
                (first_name, FIRST_NAME_HEADER),
                (last_name, LAST_NAME_HEADER),
            ]
            .into_iter()
            .filter(|(found, _)| found.is_none())
            .map(|(_, keyword)| keyword)
            .collect();
            Err(SpreadsheetError::MissingColumns { missing })
        }
    }
}

/// Build voter records from an already decoded grid of cells.
pub fn voters_from_grid(grid: &[Vec<String>]) -> Result<ParsedSheet, SpreadsheetError> {
    if grid.len() < 2 {
        return Err(SpreadsheetError::EmptyFile);
    }
    let columns = resolve_columns(&grid[0])?;
    debug!("Resolved spreadsheet columns: {columns:?}");

    let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();
    let data_rows = &grid[1..];
    let voters: Vec<VoterRecord> = data_rows
        .iter()
        .map(|row| {
            VoterRecord::new(
                cell(row, columns.id),
                cell(row, columns.first_name),
                cell(row, columns.last_name),
            )
        })
        .filter(VoterRecord::is_complete)
        .collect();

    if voters.is_empty() {
        return Err(SpreadsheetError::NoValidRows);
    }
    let blank = data_rows.iter().filter(|row| is_blank(row)).count();
    let skipped = data_rows.len() - blank - voters.len();
    if skipped > 0 {
        info!("Skipped {skipped} spreadsheet row(s) without an id or first name");
    }
    Ok(ParsedSheet { voters, skipped })
}

/// Decode raw file bytes into rows of displayed cell text.
///
/// Blank rows inside the sheet are kept, so the header is always the first
/// row of the used range. Completely empty CSV lines never reach the grid.
pub fn decode_grid(
    bytes: &[u8],
    format: SpreadsheetFormat,
) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    match format {
        SpreadsheetFormat::Csv => decode_csv(bytes),
        SpreadsheetFormat::Workbook => decode_workbook(bytes),
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(String::is_empty)
}

/// Decode and parse in one step.
pub fn parse_sheet(bytes: &[u8], format: SpreadsheetFormat) -> Result<ParsedSheet, SpreadsheetError> {
    let grid = decode_grid(bytes, format)?;
    voters_from_grid(&grid)
}

/// Decode and parse, keeping only the accepted voters.
pub fn parse_voters(
    bytes: &[u8],
    format: SpreadsheetFormat,
) -> Result<Vec<VoterRecord>, SpreadsheetError> {
    parse_sheet(bytes, format).map(|sheet| sheet.voters)
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn decode_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// The text a spreadsheet would display for a cell.
fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Empty | DataType::Error(_) => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(n) => n.to_string(),
        DataType::Float(f) => float_text(*f),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn float_text(f: f64) -> String {
    // Whole numbers (typically IDs) read back as floats from xlsx.
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_matching_is_fuzzy() {
        let columns = resolve_columns(&["ID Votante", "Nombre Completo", "Apellido Paterno"]).unwrap();
        assert_eq!(
            columns,
            ColumnIndices {
                id: 0,
                first_name: 1,
                last_name: 2
            }
        );

        let columns = resolve_columns(&[" Voter ID", "NOMBRE ", "  Apellidos"]).unwrap();
        assert_eq!(
            columns,
            ColumnIndices {
                id: 0,
                first_name: 1,
                last_name: 2
            }
        );
    }

    #[test]
    fn apellido_header_also_matches_id() {
        // "apellido" contains "id", so it is taken as the ID column when it
        // comes first.
        let columns = resolve_columns(&["Apellido", "Nombre", "ID"]).unwrap();
        assert_eq!(columns.id, 0);
        assert_eq!(columns.last_name, 0);
    }

    #[test]
    fn apellido_alone_satisfies_id_and_last_name() {
        // Substring matching lets "Apellido" serve as the ID column too.
        let columns = resolve_columns(&["Código", "Nombre", "Apellido"]).unwrap();
        assert_eq!(
            columns,
            ColumnIndices {
                id: 2,
                first_name: 1,
                last_name: 2
            }
        );
    }

    #[test]
    fn header_without_id_is_rejected() {
        let result = resolve_columns(&["Código", "Nombre", "Surname"]);
        match result {
            Err(SpreadsheetError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["id", "apellido"])
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn first_matching_header_wins() {
        // "Nombre ID" also contains "id" but comes after "Identificador".
        let columns = resolve_columns(&["Identificador", "Nombre ID", "Apellido"]).unwrap();
        assert_eq!(columns.id, 0);
        assert_eq!(columns.first_name, 1);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let sheet = voters_from_grid(&grid(&[
            &["id", "nombre", "apellido"],
            &["1", "Ana", "Ruiz"],
            &["", "Luis", "Gomez"],
            &["3", "", "Diaz"],
        ]))
        .unwrap();

        assert_eq!(sheet.voters, vec![VoterRecord::new("1", "Ana", "Ruiz")]);
        assert!(sheet.voters[0].enabled);
        assert_eq!(sheet.skipped, 2);
    }

    #[test]
    fn short_rows_read_missing_cells_as_empty() {
        let sheet = voters_from_grid(&grid(&[&["id", "nombre", "apellido"], &["9", "Eva"]])).unwrap();
        assert_eq!(sheet.voters, vec![VoterRecord::new("9", "Eva", "")]);
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let sheet = voters_from_grid(&grid(&[
            &["id", "nombre", "apellido"],
            &["1", "Ana", "Ruiz"],
            &["1", "Ana", "Ruiz"],
        ]))
        .unwrap();
        assert_eq!(sheet.voters.len(), 2);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(matches!(
            voters_from_grid(&grid(&[&["id", "nombre", "apellido"]])),
            Err(SpreadsheetError::EmptyFile)
        ));
        assert!(matches!(voters_from_grid(&[]), Err(SpreadsheetError::EmptyFile)));
    }

    #[test]
    fn blank_rows_after_header_are_not_voters() {
        let blank_only = grid(&[&["id", "nombre", "apellido"], &["", "", ""], &[""]]);
        assert!(matches!(
            voters_from_grid(&blank_only),
            Err(SpreadsheetError::NoValidRows)
        ));

        let sheet = voters_from_grid(&grid(&[
            &["id", "nombre", "apellido"],
            &["", "", ""],
            &["1", "Ana", "Ruiz"],
            &["", "Luis", ""],
        ]))
        .unwrap();
        assert_eq!(sheet.voters, vec![VoterRecord::new("1", "Ana", "Ruiz")]);
        assert_eq!(sheet.skipped, 1);
    }

    #[test]
    fn leading_blank_row_is_taken_as_header() {
        assert!(matches!(
            voters_from_grid(&grid(&[&["", "", ""], &["id", "nombre", "apellido"], &["1", "Ana", "Ruiz"]])),
            Err(SpreadsheetError::MissingColumns { .. })
        ));
    }

    #[test]
    fn csv_header_with_blank_rows() {
        assert!(matches!(
            parse_voters(b"id,nombre,apellido\n,,\n,,\n", SpreadsheetFormat::Csv),
            Err(SpreadsheetError::NoValidRows)
        ));
    }

    #[test]
    fn no_valid_rows() {
        assert!(matches!(
            voters_from_grid(&grid(&[&["id", "nombre", "apellido"], &["", "Ana", "Ruiz"]])),
            Err(SpreadsheetError::NoValidRows)
        ));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            SpreadsheetFormat::from_file_name("votantes.CSV").unwrap(),
            SpreadsheetFormat::Csv
        );
        assert_eq!(
            SpreadsheetFormat::from_file_name("votantes.xlsx").unwrap(),
            SpreadsheetFormat::Workbook
        );
        assert_eq!(
            SpreadsheetFormat::from_file_name("old.xls").unwrap(),
            SpreadsheetFormat::Workbook
        );
        assert!(matches!(
            SpreadsheetFormat::from_file_name("votantes.txt"),
            Err(SpreadsheetError::UnsupportedFormat(_))
        ));
        assert!(SpreadsheetFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn csv_upload() {
        let bytes = b"\xEF\xBB\xBFID,Nombre,Apellido\n1,Ana,Ruiz\n,Luis,Gomez\n3,,Diaz\n\n4,Marta\n";
        let sheet = parse_sheet(bytes, SpreadsheetFormat::Csv).unwrap();
        assert_eq!(
            sheet.voters,
            vec![
                VoterRecord::new("1", "Ana", "Ruiz"),
                VoterRecord::new("4", "Marta", ""),
            ]
        );
    }

    #[test]
    fn csv_header_only() {
        assert!(matches!(
            parse_voters(b"id,nombre,apellido\n", SpreadsheetFormat::Csv),
            Err(SpreadsheetError::EmptyFile)
        ));
    }

    #[test]
    fn parsing_is_deterministic() {
        let bytes = b"id,nombre,apellido\n2,Luis,Gomez\n1,Ana,Ruiz\n";
        let first = parse_voters(bytes, SpreadsheetFormat::Csv).unwrap();
        let second = parse_voters(bytes, SpreadsheetFormat::Csv).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "2");
    }

    #[test]
    fn xlsx_upload() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ID Votante").unwrap();
        sheet.write_string(0, 1, "Nombre").unwrap();
        sheet.write_string(0, 2, "Apellido").unwrap();
        sheet.write_number(1, 0, 1001.0).unwrap();
        sheet.write_string(1, 1, "Ana").unwrap();
        sheet.write_string(1, 2, "Ruiz").unwrap();
        sheet.write_string(2, 0, "A-7").unwrap();
        sheet.write_string(2, 1, "Luis").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let voters = parse_voters(&bytes, SpreadsheetFormat::Workbook).unwrap();
        assert_eq!(
            voters,
            vec![
                VoterRecord::new("1001", "Ana", "Ruiz"),
                VoterRecord::new("A-7", "Luis", ""),
            ]
        );
    }

    #[test]
    fn garbage_workbook_fails_to_decode() {
        assert!(matches!(
            parse_voters(b"definitely not a workbook", SpreadsheetFormat::Workbook),
            Err(SpreadsheetError::Workbook(_))
        ));
    }

    #[test]
    fn float_cells_display_like_spreadsheets() {
        assert_eq!(float_text(12.0), "12");
        assert_eq!(float_text(-3.0), "-3");
        assert_eq!(float_text(1.5), "1.5");
    }
}
