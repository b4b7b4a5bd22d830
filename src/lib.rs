//! Rust xlsx record reader and writer
//!
//! # Status
//!
//! **gridrecord** is a pure Rust library to consume and produce xlsx
//! worksheets through a sequential, field-delimited record interface, the
//! same shape a delimited-text (CSV) parser or writer exposes.
//!
//! A worksheet is a sparse, random-access grid of typed cells. This crate
//! flattens it into a strictly ordered stream of string records for
//! reading, and maps a stream of records back onto absolute cell
//! coordinates for writing, so record-mapping layers written against a
//! text-delimited contract can consume spreadsheets without knowing it.
//!
//! # Examples
//! ```no_run
//! use gridrecord::SheetParser;
//!
//! // opens a workbook and walks the first sheet record by record
//! let mut parser = SheetParser::open("import.xlsx").expect("Cannot open file");
//! while parser.advance().expect("read error") {
//!     let record = parser.record().expect("no record");
//!     println!("row {}: {:?}", parser.row(), record);
//! }
//! ```
//!
//! ```
//! use std::io::Cursor;
//! use gridrecord::{Config, SheetWriter};
//!
//! let mut buffer = Cursor::new(Vec::new());
//! let mut writer = SheetWriter::new(&mut buffer, Config::new().leave_open(true))
//!     .expect("Cannot create writer");
//! writer.write_field("name", false).unwrap();
//! writer.write_field("amount", false).unwrap();
//! writer.next_record().unwrap();
//! // nothing reaches the buffer until the writer is finished
//! writer.finish().unwrap();
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod utils;
mod datatype;
mod xlsx;

mod config;
mod parser;
mod reader;
mod writer;
pub mod errors;

use std::fmt;

pub use config::{Config, ShouldQuote, SkipRecord};
pub use datatype::{CellErrorType, Data};
pub use errors::Error;
pub use parser::SheetParser;
pub use reader::SheetReader;
pub use writer::SheetWriter;
pub use xlsx::XlsxError;

/// Sentinel reported by [`RecordSource::byte_count`] and
/// [`RecordSource::char_count`]: a cell grid has no byte or character
/// positions, so the counts are unknown rather than an error.
pub const COUNT_UNKNOWN: i64 = -1;

/// The pull contract a record-mapping layer reads from.
///
/// This is the grid-backed equivalent of a delimited-text parser: records
/// are delivered one at a time, in order, as owned strings. A mapping layer
/// written against this trait cannot tell a worksheet from a text stream.
pub trait RecordSource {
    /// Advances to the next record.
    ///
    /// Returns `Ok(false)` once the source is exhausted; exhaustion is a
    /// terminal state, not an error.
    fn advance(&mut self) -> Result<bool, Error>;

    /// The most recently materialized record.
    ///
    /// Fails with [`Error::InvalidState`] before the first successful
    /// advance and after exhaustion.
    fn record(&self) -> Result<&[String], Error>;

    /// Field at `index` in the current record, `None` when the index is out
    /// of bounds or no record is current. Out-of-range access is tolerated,
    /// never an error.
    fn field(&self, index: usize) -> Option<&str>;

    /// 1-based logical row most recently consumed, `0` before the first
    /// advance.
    fn row(&self) -> u32;

    /// 1-based physical sheet row most recently consumed, row offset
    /// included, `0` before the first advance.
    fn raw_row(&self) -> u32;

    /// Bytes consumed so far. Meaningless for a grid source.
    fn byte_count(&self) -> i64 {
        COUNT_UNKNOWN
    }

    /// Characters consumed so far. Meaningless for a grid source.
    fn char_count(&self) -> i64 {
        COUNT_UNKNOWN
    }
}

/// The push contract a record-mapping layer writes into.
///
/// Mirrors a delimited-text writer: fields arrive one at a time and a
/// record boundary is signalled explicitly.
pub trait RecordSink {
    /// Writes one field at the current cursor position and advances the
    /// column cursor. `should_quote` is part of the text-delimited contract
    /// and is ignored by grid sinks, which have no quoting.
    fn write_field(&mut self, field: &str, should_quote: bool) -> Result<(), Error>;

    /// Signals a record boundary: flushes, resets the column cursor and
    /// advances the row cursor.
    fn next_record(&mut self) -> Result<(), Error>;

    /// Flushes pending output. Grid sinks persist at disposal, so this is
    /// a contract no-op.
    fn flush(&mut self) -> Result<(), Error>;
}

/// A trait to constrain cells
pub trait CellType: Default + Clone + PartialEq {}
impl<T: Default + Clone + PartialEq> CellType for T {}

/// A struct to hold cell position and value
#[derive(Debug, Clone)]
pub struct Cell<T: CellType> {
    /// Position for the cell (row, column), 0-based
    pos: (u32, u32),
    /// Value for the cell
    val: T,
}

impl<T: CellType> Cell<T> {
    /// Creates a new `Cell`
    pub fn new(position: (u32, u32), value: T) -> Cell<T> {
        Cell {
            pos: position,
            val: value,
        }
    }

    /// Gets `Cell` position (row, column)
    pub fn get_position(&self) -> (u32, u32) {
        self.pos
    }

    /// Gets `Cell` value
    pub fn get_value(&self) -> &T {
        &self.val
    }
}

/// A rectangular dimension of cells, 0-based, inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    /// Top left cell (row, column)
    pub start: (u32, u32),
    /// Bottom right cell (row, column)
    pub end: (u32, u32),
}

impl Dimensions {
    /// Number of cells covered by the dimension
    pub fn len(&self) -> u64 {
        (self.end.0 - self.start.0 + 1) as u64 * (self.end.1 - self.start.1 + 1) as u64
    }

    /// Whether the dimension covers no cell
    pub fn is_empty(&self) -> bool {
        self.start.0 > self.end.0 || self.start.1 > self.end.1
    }
}

/// A squared selection of cells, the used bounding box of a worksheet.
///
/// Built once from the sparse list of used cells; cells inside the box that
/// were never written stay `T::default()`.
#[derive(Debug, Default, Clone)]
pub struct Range<T: CellType> {
    start: (u32, u32),
    end: (u32, u32),
    inner: Vec<T>,
}

impl<T: CellType> Range<T> {
    /// Creates a new `Range` filled with default values
    pub fn new(start: (u32, u32), end: (u32, u32)) -> Range<T> {
        Range {
            start,
            end,
            inner: vec![T::default(); ((end.0 - start.0 + 1) * (end.1 - start.1 + 1)) as usize],
        }
    }

    /// Get top left cell position (row, column)
    pub fn start(&self) -> (u32, u32) {
        self.start
    }

    /// Get bottom right cell position (row, column)
    pub fn end(&self) -> (u32, u32) {
        self.end
    }

    /// Get column width
    pub fn width(&self) -> usize {
        (self.end.1 - self.start.1 + 1) as usize
    }

    /// Get row height
    pub fn height(&self) -> usize {
        (self.end.0 - self.start.0 + 1) as usize
    }

    /// Get size in (height, width) format
    pub fn get_size(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Is the range empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Creates a `Range` from a coo sparse vector of `Cell`s.
    ///
    /// Coordinate list (COO) is the natural way cells are stored in the
    /// file; inner size is defined by the bounding box of non empty cells.
    ///
    /// cells: `Vec` of non empty `Cell`s, sorted by row
    ///
    /// # Panics
    ///
    /// panics when a `Cell` row is lower than the first `Cell` row or
    /// bigger than the last `Cell` row.
    pub fn from_sparse(cells: Vec<Cell<T>>) -> Range<T> {
        if cells.is_empty() {
            Range {
                start: (0, 0),
                end: (0, 0),
                inner: Vec::new(),
            }
        } else {
            // search bounds
            let row_start = cells.first().unwrap().pos.0;
            let row_end = cells.last().unwrap().pos.0;
            let mut col_start = u32::MAX;
            let mut col_end = 0;
            for c in cells.iter().map(|c| c.pos.1) {
                if c < col_start {
                    col_start = c;
                }
                if c > col_end {
                    col_end = c;
                }
            }
            let width = col_end - col_start + 1;
            let len = ((row_end - row_start + 1) * width) as usize;
            let mut v = vec![T::default(); len];
            v.shrink_to_fit();
            for c in cells {
                let idx = ((c.pos.0 - row_start) * width + (c.pos.1 - col_start)) as usize;
                v[idx] = c.val;
            }
            Range {
                start: (row_start, col_start),
                end: (row_end, col_end),
                inner: v,
            }
        }
    }

    /// Get cell value from absolute position (row, column), 0-based.
    ///
    /// Returns `None` when the position falls outside the used bounding
    /// box; an absent cell is a valid lookup, not an error.
    pub fn get(&self, absolute_position: (u32, u32)) -> Option<&T> {
        let (row, col) = absolute_position;
        if self.inner.is_empty()
            || row < self.start.0
            || col < self.start.1
            || row > self.end.0
            || col > self.end.1
        {
            return None;
        }
        let idx = (row - self.start.0) as usize * self.width() + (col - self.start.1) as usize;
        self.inner.get(idx)
    }

    /// Get an iterator over inner rows
    pub fn rows(&self) -> Rows<'_, T> {
        if self.inner.is_empty() {
            Rows { inner: None }
        } else {
            let width = self.width();
            Rows {
                inner: Some(self.inner.chunks(width)),
            }
        }
    }
}

/// An iterator to read a `Range` row by row
#[derive(Debug)]
pub struct Rows<'a, T: 'a + CellType> {
    inner: Option<std::slice::Chunks<'a, T>>,
}

impl<'a, T: 'a + CellType> Iterator for Rows<'a, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut().and_then(|c| c.next())
    }
}

impl<T: CellType + fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for (i, c) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ";")?;
                }
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
