// Excel export of tables, and reading exported tables back.

use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use rust_xlsxwriter::{ColNum, Format, FormatBorder, RowNum, Workbook};

use crate::kobo::*;

/// Excel refuses longer sheet names.
const MAX_SHEET_NAME: usize = 31;

const MAX_COLUMNS: usize = 16_384;

/// A valid worksheet name for `name`.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    // Sheet names cannot start or end with an apostrophe.
    let cleaned = cleaned.trim_matches('\'');
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Wide tables get narrower columns.
pub fn column_width(num_columns: usize) -> f64 {
    if num_columns >= 4 {
        20.0
    } else {
        40.0
    }
}

fn build_workbook(table: &Table, name: &str, path: &str) -> KoboResult<Workbook> {
    ensure!(
        table.num_columns() <= MAX_COLUMNS,
        SheetTooLargeSnafu {
            columns: table.num_columns()
        }
    );
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name(name))
        .context(WritingExcelSnafu { path })?;
    let format = Format::new()
        .set_text_wrap()
        .set_border(FormatBorder::Thin);
    let width = column_width(table.num_columns());

    for (col_idx, header) in table.columns.iter().enumerate() {
        let col = col_idx as ColNum;
        worksheet
            .set_column_width(col, width)
            .context(WritingExcelSnafu { path })?;
        worksheet
            .write_string_with_format(0, col, header, &format)
            .context(WritingExcelSnafu { path })?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let xrow = (row_idx + 1) as RowNum;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as ColNum;
            let written = match cell {
                Some(s) => worksheet.write_string_with_format(xrow, col, s, &format),
                None => worksheet.write_blank(xrow, col, &format),
            };
            written.context(WritingExcelSnafu { path })?;
        }
    }
    Ok(workbook)
}

/// The table as the bytes of an xlsx file, with a single worksheet.
pub fn xlsx_bytes(table: &Table, name: &str) -> BKoboResult<Vec<u8>> {
    let mut workbook = build_workbook(table, name, "<memory>")?;
    let bytes = workbook
        .save_to_buffer()
        .context(WritingExcelSnafu { path: "<memory>" })?;
    Ok(bytes)
}

pub fn export_xlsx(table: &Table, name: &str, path: &Path) -> BKoboResult<()> {
    let path_s = path.display().to_string();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context(WritingFileSnafu {
                path: parent.display().to_string(),
            })?;
        }
    }
    let bytes = xlsx_bytes(table, name)?;
    std::fs::write(path, bytes).context(WritingFileSnafu { path: path_s })?;
    Ok(())
}

fn read_cell(cell: &calamine::DataType) -> Cell {
    match cell {
        calamine::DataType::Empty => None,
        calamine::DataType::String(s) => Some(s.clone()),
        calamine::DataType::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Some(format!("{}", *f as i64))
        }
        calamine::DataType::Float(f) => Some(f.to_string()),
        calamine::DataType::Int(i) => Some(i.to_string()),
        calamine::DataType::Bool(b) => Some(b.to_string()),
        calamine::DataType::DateTime(f) => Some(f.to_string()),
        x => Some(format!("{:?}", x)),
    }
}

/// Reads the first worksheet of an xlsx file. The first row is the header.
pub fn read_first_sheet(path: &str) -> BKoboResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })?;
    let mut rows = wrange.rows();
    let header = rows.next().context(EmptyExcelSnafu { path })?;
    debug!("read_first_sheet: header: {:?}", header);
    let columns: Vec<String> = header
        .iter()
        .map(|c| read_cell(c).unwrap_or_default())
        .collect();
    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(read_cell).collect());
    }
    Ok(table)
}
