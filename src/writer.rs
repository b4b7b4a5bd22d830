//! Sequential record writer targeting a worksheet

use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::error;
use rust_xlsxwriter::{ExcelDateTime, Format, Note, Workbook};

use crate::config::Config;
use crate::datatype::Data;
use crate::errors::Error;
use crate::RecordSink;

const DEFAULT_SHEET_NAME: &str = "export";

/// A push based record writer mapping fields onto worksheet cells.
///
/// Fields land at a (row, column) cursor starting at (1, 1);
/// [`next_record`](SheetWriter::next_record) resets the column and moves
/// the row down. Nothing reaches the destination stream until
/// [`finish`](SheetWriter::finish): the workbook is built in memory and
/// persisted exactly once.
///
/// Dropping an unfinished writer persists as a backstop, but any error
/// there can only be logged. Call `finish` to observe it.
pub struct SheetWriter<W: Write> {
    workbook: Workbook,
    dest: Option<W>,
    config: Config,
    date_format: Format,
    number_format: Option<Format>,
    /// 1-based logical cursor
    row: u32,
    col: u16,
    finished: bool,
}

impl SheetWriter<File> {
    /// Creates a writer persisting to a new file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_path_with_config(path, Config::default())
    }

    /// Creates a writer persisting to a new file at `path` with an
    /// explicit configuration.
    pub fn from_path_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Error> {
        Self::new(File::create(path)?, config)
    }
}

impl<W: Write> SheetWriter<W> {
    /// Creates a writer persisting to `stream` at
    /// [`finish`](SheetWriter::finish) time.
    ///
    /// The target worksheet is named after [`Config::sheet_name`], or
    /// `"export"` when unset.
    pub fn new(stream: W, config: Config) -> Result<Self, Error> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let name = config.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME);
        sheet.set_name(name).map_err(Error::Workbook)?;

        let date_format = Format::new().set_num_format(&config.date_format);
        let number_format = config
            .number_format
            .as_deref()
            .map(|f| Format::new().set_num_format(f));

        Ok(SheetWriter {
            workbook,
            dest: Some(stream),
            config,
            date_format,
            number_format,
            row: 1,
            col: 1,
            finished: false,
        })
    }

    /// Borrows the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 1-based logical row the next field will land on.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// 1-based logical column the next field will land on.
    pub fn column(&self) -> u16 {
        self.col
    }

    fn cursor_cell(&self) -> (u32, u16) {
        (
            self.row - 1 + self.config.row_offset,
            self.col - 1 + self.config.column_offset,
        )
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.finished {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Writes one field at the cursor and advances the column.
    ///
    /// An empty field writes no cell at all, the cell stays absent rather
    /// than holding an empty string; the column still advances.
    /// `should_quote` belongs to the text-delimited contract and is
    /// ignored, cells have no quoting.
    pub fn write_field(&mut self, field: &str, _should_quote: bool) -> Result<(), Error> {
        self.check_open()?;
        if !field.is_empty() {
            let value = self.sanitize(field);
            let (row, col) = self.cursor_cell();
            self.workbook
                .worksheet_from_index(0)
                .and_then(|s| s.write_string(row, col, value.as_ref()))
                .map_err(Error::Workbook)?;
        }
        self.col = self.col.saturating_add(1);
        Ok(())
    }

    /// Writes one typed field at the cursor and advances the column.
    ///
    /// The declared type selects the cell representation and its format
    /// hint: dates get [`Config::date_format`], numbers get
    /// [`Config::number_format`] when one is set. Strings go through the
    /// same sanitization as [`write_field`](SheetWriter::write_field).
    pub fn write_field_typed(&mut self, field: &Data) -> Result<(), Error> {
        self.check_open()?;
        let (row, col) = self.cursor_cell();
        match field {
            Data::Empty => {}
            Data::String(s) => return self.write_field(s, false),
            Data::Bool(b) => {
                self.workbook
                    .worksheet_from_index(0)
                    .and_then(|s| s.write_boolean(row, col, *b))
                    .map_err(Error::Workbook)?;
            }
            Data::Int(i) => self.write_number(row, col, *i as f64)?,
            Data::Float(f) => self.write_number(row, col, *f)?,
            Data::DateTimeIso(s) => match ExcelDateTime::parse_from_str(s) {
                Ok(dt) => {
                    let format = self.date_format.clone();
                    self.workbook
                        .worksheet_from_index(0)
                        .and_then(|sheet| sheet.write_datetime_with_format(row, col, dt, &format))
                        .map_err(Error::Workbook)?;
                }
                // not a recognized temporal value, keep the text as is
                Err(_) => return self.write_field(s, false),
            },
            Data::Error(e) => return self.write_field(&e.to_string(), false),
        }
        self.col = self.col.saturating_add(1);
        Ok(())
    }

    fn write_number(&mut self, row: u32, col: u16, value: f64) -> Result<(), Error> {
        let sheet = self
            .workbook
            .worksheet_from_index(0)
            .map_err(Error::Workbook)?;
        match &self.number_format {
            Some(format) => sheet.write_number_with_format(row, col, value, format),
            None => sheet.write_number(row, col, value),
        }
        .map_err(Error::Workbook)?;
        Ok(())
    }

    /// Writes a date value at the cursor with the configured date format
    /// and advances the column.
    #[cfg(feature = "chrono")]
    #[cfg_attr(docsrs, doc(cfg(feature = "chrono")))]
    pub fn write_datetime(&mut self, value: &chrono::NaiveDateTime) -> Result<(), Error> {
        self.check_open()?;
        let (row, col) = self.cursor_cell();
        let format = self.date_format.clone();
        self.workbook
            .worksheet_from_index(0)
            .and_then(|s| s.write_datetime_with_format(row, col, value, &format))
            .map_err(Error::Workbook)?;
        self.col = self.col.saturating_add(1);
        Ok(())
    }

    /// Attaches a comment to the cell at the current cursor position.
    ///
    /// Out-of-band metadata, it does not consume a field slot.
    pub fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        self.check_open()?;
        let (row, col) = self.cursor_cell();
        let note = Note::new(text).add_author_prefix(false);
        self.workbook
            .worksheet_from_index(0)
            .and_then(|s| s.insert_note(row, col, &note))
            .map_err(Error::Workbook)?;
        Ok(())
    }

    /// Signals a record boundary: the column cursor resets to 1 and the
    /// row cursor moves down by one.
    pub fn next_record(&mut self) -> Result<(), Error> {
        self.check_open()?;
        self.col = 1;
        self.row += 1;
        Ok(())
    }

    /// Suspendable form of [`next_record`](SheetWriter::next_record).
    /// Nothing suspends, the future resolves immediately.
    pub async fn next_record_async(&mut self) -> Result<(), Error> {
        self.next_record()
    }

    /// A contract no-op. Cell writes are in-memory and persistence
    /// happens once at [`finish`](SheetWriter::finish).
    pub fn flush(&mut self) -> Result<(), Error> {
        self.check_open()
    }

    /// Suspendable form of [`flush`](SheetWriter::flush).
    pub async fn flush_async(&mut self) -> Result<(), Error> {
        self.flush()
    }

    /// Sets the width of a 1-based physical sheet column.
    pub fn set_column_width(&mut self, column: u16, width: f64) -> Result<(), Error> {
        self.check_open()?;
        if column == 0 {
            return Err(Error::Msg("columns are 1-based"));
        }
        self.workbook
            .worksheet_from_index(0)
            .and_then(|s| s.set_column_width(column - 1, width))
            .map_err(Error::Workbook)?;
        Ok(())
    }

    /// Sets the height of a 1-based physical sheet row.
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), Error> {
        self.check_open()?;
        if row == 0 {
            return Err(Error::Msg("rows are 1-based"));
        }
        self.workbook
            .worksheet_from_index(0)
            .and_then(|s| s.set_row_height(row - 1, height))
            .map_err(Error::Workbook)?;
        Ok(())
    }

    /// Widens every column to fit its content.
    pub fn adjust_to_contents(&mut self) -> Result<(), Error> {
        self.check_open()?;
        self.workbook
            .worksheet_from_index(0)
            .map_err(Error::Workbook)?
            .autofit();
        Ok(())
    }

    /// Persists the workbook to the destination stream, exactly once.
    ///
    /// Unless [`Config::leave_open`] is set the stream is released
    /// afterwards. Subsequent writes fail with [`Error::Disposed`];
    /// calling `finish` again is a no-op.
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.finished {
            return Ok(());
        }
        // mark first so a failed save is not retried from drop
        self.finished = true;
        let buf = self.workbook.save_to_buffer().map_err(Error::Workbook)?;
        if let Some(dest) = self.dest.as_mut() {
            dest.write_all(&buf)?;
            dest.flush()?;
        }
        if !self.config.leave_open {
            self.dest = None;
        }
        Ok(())
    }

    /// Consumes the writer and hands back the destination stream.
    ///
    /// `None` when the stream was already released by a finish without
    /// [`Config::leave_open`].
    pub fn into_inner(mut self) -> Option<W> {
        self.dest.take()
    }

    fn sanitize<'a>(&self, field: &'a str) -> Cow<'a, str> {
        let stripped = strip_control_characters(field);
        if self.config.sanitize_for_injection
            && stripped
                .chars()
                .next()
                .is_some_and(|c| self.config.injection_characters.contains(&c))
        {
            let mut escaped = String::with_capacity(stripped.len() + 1);
            escaped.push(self.config.injection_escape_character);
            escaped.push_str(&stripped);
            Cow::Owned(escaped)
        } else {
            stripped
        }
    }
}

impl<W: Write> RecordSink for SheetWriter<W> {
    fn write_field(&mut self, field: &str, should_quote: bool) -> Result<(), Error> {
        SheetWriter::write_field(self, field, should_quote)
    }

    fn next_record(&mut self) -> Result<(), Error> {
        SheetWriter::next_record(self)
    }

    fn flush(&mut self) -> Result<(), Error> {
        SheetWriter::flush(self)
    }
}

impl<W: Write> Drop for SheetWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                error!("persisting workbook on drop failed: {e}");
            }
        }
    }
}

/// Removes characters a spreadsheet cell cannot hold.
///
/// Tab, line feed and carriage return are legal cell content and stay.
fn strip_control_characters(field: &str) -> Cow<'_, str> {
    fn is_illegal(c: char) -> bool {
        matches!(c, '\x00'..='\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F')
    }
    if field.chars().any(is_illegal) {
        Cow::Owned(field.chars().filter(|&c| !is_illegal(c)).collect())
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn strips_illegal_control_characters() {
        assert_eq!(strip_control_characters("a\x00b\x1Fc"), "abc");
        assert_eq!(strip_control_characters("a\tb\r\nc"), "a\tb\r\nc");
        assert!(matches!(
            strip_control_characters("plain"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn injection_escape_is_opt_in() {
        let buffer = Cursor::new(Vec::new());
        let writer = SheetWriter::new(buffer, Config::default()).unwrap();
        assert_eq!(writer.sanitize("=1+2"), "=1+2");

        let buffer = Cursor::new(Vec::new());
        let config = Config::new().sanitize_for_injection(true);
        let writer = SheetWriter::new(buffer, config).unwrap();
        assert_eq!(writer.sanitize("=1+2"), "\t=1+2");
        assert_eq!(writer.sanitize("@cmd"), "\t@cmd");
        assert_eq!(writer.sanitize("safe"), "safe");
    }

    #[test]
    fn writes_fail_after_finish() {
        let buffer = Cursor::new(Vec::new());
        let mut writer =
            SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
        writer.write_field("a", false).unwrap();
        writer.finish().unwrap();
        assert!(matches!(
            writer.write_field("b", false),
            Err(Error::Disposed)
        ));
        assert!(matches!(writer.next_record(), Err(Error::Disposed)));
        assert!(matches!(writer.write_comment("c"), Err(Error::Disposed)));
        // a second finish is not an error
        writer.finish().unwrap();
    }

    #[test]
    fn empty_fields_never_overflow_the_column_cursor() {
        let buffer = Cursor::new(Vec::new());
        let mut writer =
            SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
        // empty fields skip the cell write but still advance the cursor;
        // past u16::MAX it saturates instead of wrapping
        for _ in 0..70_000 {
            writer.write_field("", false).unwrap();
        }
        assert_eq!(writer.column(), u16::MAX);
        writer.next_record().unwrap();
        assert_eq!(writer.column(), 1);
        writer.write_field("back", false).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn cursor_moves_per_field_and_record() {
        let buffer = Cursor::new(Vec::new());
        let mut writer =
            SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
        assert_eq!((writer.row(), writer.column()), (1, 1));
        writer.write_field("a", false).unwrap();
        writer.write_field("", false).unwrap();
        assert_eq!((writer.row(), writer.column()), (1, 3));
        writer.next_record().unwrap();
        assert_eq!((writer.row(), writer.column()), (2, 1));
    }
}
