//! `Error` management module
//!
//! Gathers every error the record components can surface, with conversions
//! from the grid collaborators on both the read and the write side.

use std::fmt;

use crate::xlsx::XlsxError;

/// A struct to handle any error and a message
#[derive(Debug)]
pub enum Error {
    /// Io error
    Io(std::io::Error),
    /// Error while reading the backing workbook
    Xlsx(XlsxError),
    /// Error raised by the workbook being written
    Workbook(rust_xlsxwriter::XlsxError),
    /// A record was requested before the first advance or after exhaustion
    InvalidState,
    /// A write was issued after the writer persisted and released its target
    Disposed,
    /// Invalid worksheet name
    WorksheetName(String),
    /// Invalid worksheet index
    WorksheetIndex(usize),
    /// General error message
    Msg(&'static str),
}

from_err!(std::io::Error, Error, Io);
from_err!(XlsxError, Error, Xlsx);
from_err!(rust_xlsxwriter::XlsxError, Error, Workbook);
from_err!(&'static str, Error, Msg);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Xlsx(e) => write!(f, "Xlsx error: {e}"),
            Error::Workbook(e) => write!(f, "Workbook error: {e}"),
            Error::InvalidState => write!(f, "no record is available, advance the parser first"),
            Error::Disposed => write!(f, "writer already persisted its workbook"),
            Error::WorksheetName(name) => write!(f, "invalid worksheet name: '{name}'"),
            Error::WorksheetIndex(idx) => write!(f, "invalid worksheet index: {idx}"),
            Error::Msg(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Xlsx(e) => Some(e),
            Error::Workbook(e) => Some(e),
            _ => None,
        }
    }
}
