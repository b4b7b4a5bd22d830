//! Sequential record reader over a worksheet

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::debug;

use crate::config::Config;
use crate::datatype::Data;
use crate::errors::Error;
use crate::xlsx::Workbook;
use crate::{Range, RecordSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// No advance issued yet
    Fresh,
    /// A record is materialized
    Active,
    /// Past the last used row, terminal
    Done,
}

/// A pull based record reader over one worksheet.
///
/// The used cells of the sheet are loaded once at construction; every
/// [`advance`](SheetParser::advance) then materializes one row as owned
/// strings, in physical order, across a column count fixed at
/// construction. The parser satisfies the same contract a delimited-text
/// parser does, so a record-mapping layer can consume it unchanged.
///
/// Reading starts at logical row 1. Rows and columns can be shifted
/// within the sheet through [`Config::row_offset`] and
/// [`Config::column_offset`]; offsets apply at physical cell access only
/// and never leak into the logical row numbering.
pub struct SheetParser<RS> {
    workbook: Workbook<RS>,
    config: Config,
    range: Range<Data>,
    comments: HashMap<(u32, u32), String>,
    /// Fixed width of every materialized record
    count: usize,
    /// 1-based logical row the next advance will read
    next_row: u32,
    /// 1-based logical row most recently consumed, 0 before the first advance
    consumed_row: u32,
    state: ReadState,
    record: Vec<String>,
}

impl SheetParser<BufReader<File>> {
    /// Opens a workbook at `path` and positions the parser on the first
    /// worksheet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a workbook at `path` with an explicit configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Error> {
        let file = BufReader::new(File::open(path)?);
        Self::new(file, config)
    }
}

impl<RS: Read + Seek> SheetParser<RS> {
    /// Creates a parser over an already open stream.
    ///
    /// The target worksheet is [`Config::sheet_name`] when set, the first
    /// worksheet otherwise. An empty sheet is a valid input and yields
    /// zero records.
    pub fn new(reader: RS, config: Config) -> Result<Self, Error> {
        let mut workbook = Workbook::new(reader)?;
        let sheet_names = workbook.sheet_names();
        let name = match config.sheet_name.as_deref() {
            Some(name) => sheet_names
                .iter()
                .find(|n| n.as_str() == name)
                .cloned()
                .ok_or_else(|| Error::WorksheetName(name.to_string()))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or(Error::WorksheetIndex(0))?,
        };
        let range = workbook.worksheet_range(&name)?;
        let comments = workbook
            .worksheet_comments(&name)?
            .into_iter()
            .map(|c| (c.get_position(), c.get_value().clone()))
            .collect::<HashMap<_, _>>();

        // record width is the used bounding box width, frozen now
        let count = if range.is_empty() { 0 } else { range.width() };
        debug!(
            "sheet '{name}': {} used rows, record width {count}",
            range.height()
        );

        Ok(SheetParser {
            workbook,
            config,
            range,
            comments,
            count,
            next_row: 1,
            consumed_row: 0,
            state: ReadState::Fresh,
            record: Vec::with_capacity(count),
        })
    }

    /// Number of fields per record, fixed at construction from the used
    /// bounding box of the sheet. 0 for an empty sheet.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Worksheet names of the backing workbook, in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Borrows the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Advances to the next record, [`RecordSource::advance`] made
    /// inherent.
    pub fn advance(&mut self) -> Result<bool, Error> {
        let last_physical = if self.range.is_empty() {
            0
        } else {
            self.range.end().0 + 1
        };
        let physical = self.next_row + self.config.row_offset;
        if physical > last_physical {
            self.state = ReadState::Done;
            self.record.clear();
            return Ok(false);
        }

        // fields always start at the first sheet column past the offset,
        // whatever the leftmost used column is
        self.record.clear();
        let row0 = physical - 1;
        for i in 0..self.count {
            let col0 = self.config.column_offset as u32 + i as u32;
            let value = self
                .range
                .get((row0, col0))
                .map(ToString::to_string)
                .unwrap_or_default();
            self.record.push(value);
        }
        self.consumed_row = self.next_row;
        self.next_row += 1;
        self.state = ReadState::Active;
        Ok(true)
    }

    /// Suspendable form of [`advance`](SheetParser::advance).
    ///
    /// The grid is fully in memory, so nothing actually suspends; the
    /// future resolves immediately with the synchronous result.
    pub async fn advance_async(&mut self) -> Result<bool, Error> {
        self.advance()
    }

    /// The most recently materialized record.
    pub fn record(&self) -> Result<&[String], Error> {
        match self.state {
            ReadState::Active => Ok(&self.record),
            ReadState::Fresh | ReadState::Done => Err(Error::InvalidState),
        }
    }

    /// The current record rendered as one delimited line.
    ///
    /// Fields matched by [`Config::should_quote`] are wrapped in double
    /// quotes. This is a diagnostic rendition; cell storage itself never
    /// quotes.
    pub fn raw_record(&self) -> Result<String, Error> {
        let record = self.record()?;
        let mut line = String::new();
        for (i, field) in record.iter().enumerate() {
            if i > 0 {
                line.push(self.config.delimiter);
            }
            let quote = self
                .config
                .should_quote
                .as_ref()
                .is_some_and(|f| f(field));
            if quote {
                line.push('"');
                line.push_str(field);
                line.push('"');
            } else {
                line.push_str(field);
            }
        }
        Ok(line)
    }

    /// Field at `index` of the current record. `None` out of bounds or
    /// when no record is current; never an error.
    pub fn field(&self, index: usize) -> Option<&str> {
        match self.state {
            ReadState::Active => self.record.get(index).map(String::as_str),
            _ => None,
        }
    }

    /// Comment attached to the cell at `index` in the current record, if
    /// any.
    pub fn comment(&self, index: usize) -> Option<&str> {
        if self.state != ReadState::Active || index >= self.count {
            return None;
        }
        let row0 = self.consumed_row + self.config.row_offset - 1;
        let col0 = self.config.column_offset as u32 + index as u32;
        self.comments.get(&(row0, col0)).map(String::as_str)
    }

    /// Comment attached to the cell at 1-based logical (`row`, `column`),
    /// offsets applied, if any.
    pub fn comment_at(&self, row: u32, column: u32) -> Option<&str> {
        if column == 0 || row == 0 {
            return None;
        }
        let row0 = row + self.config.row_offset - 1;
        let col0 = column + self.config.column_offset as u32 - 1;
        self.comments.get(&(row0, col0)).map(String::as_str)
    }

    /// 1-based logical row most recently consumed, 0 before the first
    /// advance.
    pub fn row(&self) -> u32 {
        self.consumed_row
    }

    /// 1-based physical sheet row most recently consumed, row offset
    /// included.
    pub fn raw_row(&self) -> u32 {
        if self.consumed_row == 0 {
            0
        } else {
            self.consumed_row + self.config.row_offset
        }
    }

    /// Consumes the parser and hands back the underlying stream.
    pub fn into_inner(self) -> RS {
        self.workbook.into_inner()
    }
}

impl<RS: Read + Seek> RecordSource for SheetParser<RS> {
    fn advance(&mut self) -> Result<bool, Error> {
        SheetParser::advance(self)
    }

    fn record(&self) -> Result<&[String], Error> {
        SheetParser::record(self)
    }

    fn field(&self, index: usize) -> Option<&str> {
        SheetParser::field(self, index)
    }

    fn row(&self) -> u32 {
        SheetParser::row(self)
    }

    fn raw_row(&self) -> u32 {
        SheetParser::raw_row(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn workbook_bytes(rows: &[&[&str]]) -> Cursor<Vec<u8>> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet
                    .write_string(r as u32, c as u16, *value)
                    .unwrap();
            }
        }
        Cursor::new(workbook.save_to_buffer().unwrap())
    }

    #[test]
    fn record_before_advance_is_invalid() {
        let bytes = workbook_bytes(&[&["a", "b"]]);
        let parser = SheetParser::new(bytes, Config::default()).unwrap();
        assert!(matches!(parser.record(), Err(Error::InvalidState)));
        assert_eq!(parser.row(), 0);
        assert_eq!(parser.raw_row(), 0);
    }

    #[test]
    fn advances_then_exhausts() {
        let bytes = workbook_bytes(&[&["a", "b"], &["c", "d"]]);
        let mut parser = SheetParser::new(bytes, Config::default()).unwrap();
        assert_eq!(parser.count(), 2);

        assert!(parser.advance().unwrap());
        assert_eq!(parser.record().unwrap(), ["a", "b"]);
        assert_eq!(parser.row(), 1);

        assert!(parser.advance().unwrap());
        assert_eq!(parser.record().unwrap(), ["c", "d"]);
        assert_eq!(parser.field(0), Some("c"));
        assert_eq!(parser.field(5), None);

        assert!(!parser.advance().unwrap());
        assert!(matches!(parser.record(), Err(Error::InvalidState)));
        // terminal
        assert!(!parser.advance().unwrap());
    }

    #[test]
    fn empty_sheet_is_exhausted_immediately() {
        let bytes = workbook_bytes(&[]);
        let mut parser = SheetParser::new(bytes, Config::default()).unwrap();
        assert_eq!(parser.count(), 0);
        assert!(!parser.advance().unwrap());
    }

    #[test]
    fn unknown_sheet_name_fails() {
        let bytes = workbook_bytes(&[&["a"]]);
        let config = Config::new().sheet_name("nope");
        assert!(matches!(
            SheetParser::new(bytes, config),
            Err(Error::WorksheetName(_))
        ));
    }

    #[test]
    fn byte_counts_are_unknown() {
        let bytes = workbook_bytes(&[&["a"]]);
        let parser = SheetParser::new(bytes, Config::default()).unwrap();
        assert_eq!(RecordSource::byte_count(&parser), crate::COUNT_UNKNOWN);
        assert_eq!(RecordSource::char_count(&parser), crate::COUNT_UNKNOWN);
    }
}
