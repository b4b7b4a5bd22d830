//! Record-mapping layer over a [`SheetParser`]

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::config::Config;
use crate::errors::Error;
use crate::parser::SheetParser;
use crate::RecordSource;

/// A reading layer adding header handling and record skipping on top of
/// [`SheetParser`].
///
/// When [`Config::has_header_record`] is set (the default) the first
/// physical row is consumed as the header on the first
/// [`read`](SheetReader::read); fields can then be addressed by header
/// name. Records matched by [`Config::should_skip_record`] are consumed
/// but never surfaced, which is what makes
/// [`row`](SheetReader::row) and [`raw_row`](SheetReader::raw_row)
/// diverge.
pub struct SheetReader<RS> {
    parser: SheetParser<RS>,
    headers: Option<Vec<String>>,
    header_consumed: bool,
}

impl SheetReader<BufReader<File>> {
    /// Opens a workbook at `path` and reads the first worksheet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a workbook at `path` with an explicit configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Error> {
        Ok(Self::from_parser(SheetParser::open_with_config(
            path, config,
        )?))
    }
}

impl<RS: Read + Seek> SheetReader<RS> {
    /// Creates a reader over an already open stream.
    pub fn new(reader: RS, config: Config) -> Result<Self, Error> {
        Ok(Self::from_parser(SheetParser::new(reader, config)?))
    }

    /// Wraps an existing parser.
    pub fn from_parser(parser: SheetParser<RS>) -> Self {
        SheetReader {
            parser,
            headers: None,
            header_consumed: false,
        }
    }

    /// Consumes the header record explicitly.
    ///
    /// Called implicitly by the first [`read`](SheetReader::read) when
    /// the configuration declares a header record. A second call is a
    /// no-op.
    pub fn read_header(&mut self) -> Result<(), Error> {
        if self.header_consumed {
            return Ok(());
        }
        self.header_consumed = true;
        if self.parser.advance()? {
            self.headers = Some(self.parser.record()?.to_vec());
        }
        Ok(())
    }

    /// Header record, `None` until one was consumed.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Advances to the next data record, consuming (and hiding) header
    /// and skipped records on the way.
    ///
    /// Returns `Ok(false)` on exhaustion.
    pub fn read(&mut self) -> Result<bool, Error> {
        if !self.header_consumed {
            if self.parser.config().has_header_record {
                self.read_header()?;
            } else {
                self.header_consumed = true;
            }
        }
        loop {
            if !self.parser.advance()? {
                return Ok(false);
            }
            let skip = match self.parser.config().should_skip_record.as_ref() {
                Some(f) => f(self.parser.record()?),
                None => false,
            };
            if !skip {
                return Ok(true);
            }
        }
    }

    /// Suspendable form of [`read`](SheetReader::read). Nothing
    /// suspends, the future resolves immediately.
    pub async fn read_async(&mut self) -> Result<bool, Error> {
        self.read()
    }

    /// The current record.
    pub fn record(&self) -> Result<&[String], Error> {
        self.parser.record()
    }

    /// Field at `index` of the current record.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.parser.field(index)
    }

    /// Field addressed by header name, `None` when no header record was
    /// consumed or the name is unknown.
    pub fn field_by_name(&self, name: &str) -> Option<&str> {
        let index = self
            .headers
            .as_ref()?
            .iter()
            .position(|h| h == name)?;
        self.parser.field(index)
    }

    /// Comment attached to the cell at `index` in the current record.
    pub fn comment(&self, index: usize) -> Option<&str> {
        self.parser.comment(index)
    }

    /// 1-based logical row most recently consumed, header and skipped
    /// records included.
    pub fn row(&self) -> u32 {
        self.parser.row()
    }

    /// 1-based physical sheet row most recently consumed, row offset
    /// included.
    pub fn raw_row(&self) -> u32 {
        self.parser.raw_row()
    }

    /// Hands the underlying parser back.
    pub fn into_parser(self) -> SheetParser<RS> {
        self.parser
    }

    /// Consumes the reader and hands back the underlying stream.
    pub fn into_inner(self) -> RS {
        self.parser.into_inner()
    }
}

impl<RS: Read + Seek> RecordSource for SheetReader<RS> {
    fn advance(&mut self) -> Result<bool, Error> {
        self.read()
    }

    fn record(&self) -> Result<&[String], Error> {
        SheetReader::record(self)
    }

    fn field(&self, index: usize) -> Option<&str> {
        SheetReader::field(self, index)
    }

    fn row(&self) -> u32 {
        SheetReader::row(self)
    }

    fn raw_row(&self) -> u32 {
        SheetReader::raw_row(self)
    }
}
