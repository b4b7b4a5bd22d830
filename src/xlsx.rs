//! A module to read the backing xlsx workbook
//!
//! This is the read side grid collaborator: it only knows how to open a
//! zipped xml workbook and surface used cells and cell comments. Everything
//! record shaped lives in the parser built on top of it.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufReader, Read, Seek};
use std::str::FromStr;

use log::warn;
use quick_xml::{
    escape::resolve_predefined_entity,
    events::{
        attributes::{Attribute, Attributes},
        BytesRef, Event,
    },
    name::QName,
    Reader as XmlReader,
};
use zip::read::{ZipArchive, ZipFile};
use zip::result::ZipError;

use crate::datatype::{CellErrorType, Data};
use crate::{Cell, Dimensions, Range};

pub(crate) type XlReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

/// Maximum number of rows in an xlsx file
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in an xlsx file
pub const MAX_COLUMNS: u32 = 16_384;

const COMMENTS_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

/// An enum for Xlsx specific errors
#[derive(Debug)]
pub enum XlsxError {
    /// Io error
    Io(std::io::Error),
    /// Zip error
    Zip(zip::result::ZipError),
    /// Xml error
    Xml(quick_xml::Error),
    /// Xml attribute error
    XmlAttr(quick_xml::events::attributes::AttrError),
    /// XML encoding error
    Encoding(quick_xml::encoding::EncodingError),
    /// `ParseInt` error
    ParseInt(std::num::ParseIntError),
    /// Float error
    ParseFloat(std::num::ParseFloatError),
    /// Unexpected end of xml
    XmlEof(&'static str),
    /// Unexpected node
    UnexpectedNode(&'static str),
    /// File not found
    FileNotFound(String),
    /// Relationship not found
    RelationshipNotFound,
    /// Expecting alphanumeric character
    Alphanumeric(u8),
    /// Numeric column
    NumericColumn(u8),
    /// Wrong dimension count
    DimensionCount(usize),
    /// Cell 't' attribute error
    CellTAttribute(String),
    /// There is no column component in the range string
    RangeWithoutColumnComponent,
    /// There is no row component in the range string
    RangeWithoutRowComponent,
    /// Cell error
    CellError(String),
    /// Worksheet not found
    WorksheetNotFound(String),
    /// Unexpected error
    Unexpected(&'static str),
}

from_err!(std::io::Error, XlsxError, Io);
from_err!(zip::result::ZipError, XlsxError, Zip);
from_err!(quick_xml::Error, XlsxError, Xml);
from_err!(quick_xml::events::attributes::AttrError, XlsxError, XmlAttr);
from_err!(quick_xml::encoding::EncodingError, XlsxError, Encoding);
from_err!(std::num::ParseIntError, XlsxError, ParseInt);
from_err!(std::num::ParseFloatError, XlsxError, ParseFloat);

impl std::fmt::Display for XlsxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XlsxError::Io(e) => write!(f, "I/O error: {e}"),
            XlsxError::Zip(e) => write!(f, "Zip error: {e}"),
            XlsxError::Xml(e) => write!(f, "Xml error: {e}"),
            XlsxError::XmlAttr(e) => write!(f, "Xml attribute error: {e}"),
            XlsxError::Encoding(e) => write!(f, "XML encoding error: {e}"),
            XlsxError::ParseInt(e) => write!(f, "Parse integer error: {e}"),
            XlsxError::ParseFloat(e) => write!(f, "Parse float error: {e}"),
            XlsxError::XmlEof(e) => write!(f, "Unexpected end of xml, expecting '</{e}>'"),
            XlsxError::UnexpectedNode(e) => write!(f, "Expecting '{e}' node"),
            XlsxError::FileNotFound(e) => write!(f, "File not found '{e}'"),
            XlsxError::RelationshipNotFound => write!(f, "Relationship not found"),
            XlsxError::Alphanumeric(e) => {
                write!(f, "Expecting alphanumeric character, got {e:X}")
            }
            XlsxError::NumericColumn(e) => {
                write!(f, "Numeric character is not allowed for column name, got {e}")
            }
            XlsxError::DimensionCount(e) => {
                write!(f, "Range dimension must be lower than 2. Got {e}")
            }
            XlsxError::CellTAttribute(e) => write!(f, "Unknown cell 't' attribute: {e:?}"),
            XlsxError::RangeWithoutColumnComponent => {
                write!(f, "Range is missing the expected column component.")
            }
            XlsxError::RangeWithoutRowComponent => {
                write!(f, "Range is missing the expected row component.")
            }
            XlsxError::CellError(e) => write!(f, "Unsupported cell error value '{e}'"),
            XlsxError::WorksheetNotFound(n) => write!(f, "Worksheet '{n}' not found"),
            XlsxError::Unexpected(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for XlsxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XlsxError::Io(e) => Some(e),
            XlsxError::Zip(e) => Some(e),
            XlsxError::Xml(e) => Some(e),
            XlsxError::XmlAttr(e) => Some(e),
            XlsxError::Encoding(e) => Some(e),
            XlsxError::ParseInt(e) => Some(e),
            XlsxError::ParseFloat(e) => Some(e),
            _ => None,
        }
    }
}

impl FromStr for CellErrorType {
    type Err = XlsxError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "#DIV/0!" => Ok(CellErrorType::Div0),
            "#N/A" => Ok(CellErrorType::NA),
            "#NAME?" => Ok(CellErrorType::Name),
            "#NULL!" => Ok(CellErrorType::Null),
            "#NUM!" => Ok(CellErrorType::Num),
            "#REF!" => Ok(CellErrorType::Ref),
            "#VALUE!" => Ok(CellErrorType::Value),
            "#GETTING_DATA" => Ok(CellErrorType::GettingData),
            _ => Err(XlsxError::CellError(s.into())),
        }
    }
}

/// A struct representing a zipped xml workbook opened for reading
///
/// Shared strings and the sheet name/path table are read once at
/// construction; cell data is read on demand per sheet.
pub struct Workbook<RS> {
    zip: ZipArchive<RS>,
    /// Shared strings
    strings: Vec<String>,
    /// Sheet names with their path within the zip archive
    sheets: Vec<(String, String)>,
}

impl<RS: Read + Seek> Workbook<RS> {
    /// Opens a workbook from a reader
    pub fn new(reader: RS) -> Result<Self, XlsxError> {
        let mut workbook = Workbook {
            zip: ZipArchive::new(reader)?,
            strings: Vec::new(),
            sheets: Vec::new(),
        };
        workbook.read_shared_strings()?;
        let relationships = workbook.read_relationships()?;
        workbook.read_workbook(&relationships)?;
        Ok(workbook)
    }

    /// All sheet names, in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Consumes the workbook, handing the underlying reader back
    pub fn into_inner(self) -> RS {
        self.zip.into_inner()
    }

    /// Reads all used cells of a worksheet into its bounding `Range`
    pub fn worksheet_range(&mut self, name: &str) -> Result<Range<Data>, XlsxError> {
        let path = self.sheet_path(name)?.to_owned();
        let strings = &self.strings;
        let mut xml = xml_reader(&mut self.zip, &path)
            .ok_or_else(|| XlsxError::WorksheetNotFound(name.into()))??;

        let mut cells = Vec::new();
        let mut buf = Vec::with_capacity(1024);
        'xml: loop {
            buf.clear();
            match xml.read_event_into(&mut buf).map_err(XlsxError::Xml)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"dimension" => {
                        for a in e.attributes() {
                            if let Attribute {
                                key: QName(b"ref"),
                                value: rdim,
                            } = a?
                            {
                                let dim = get_dimension(&rdim)?;
                                if dim.len() < 100_000 {
                                    cells.reserve(dim.len() as usize);
                                }
                                continue 'xml;
                            }
                        }
                        return Err(XlsxError::UnexpectedNode("dimension"));
                    }
                    b"sheetData" => {
                        read_sheet_data(&mut xml, strings, &mut cells)?;
                        break;
                    }
                    _ => (),
                },
                Event::Eof => return Err(XlsxError::XmlEof("worksheet")),
                _ => (),
            }
        }
        Ok(Range::from_sparse(cells))
    }

    /// Reads all cell comments of a worksheet, absolute (row, column)
    /// positions with the comment text.
    ///
    /// An empty `Vec` when the sheet carries no comments part.
    pub fn worksheet_comments(&mut self, name: &str) -> Result<Vec<Cell<String>>, XlsxError> {
        let path = self.sheet_path(name)?.to_owned();
        let comments_path = match self.comments_path(&path)? {
            Some(p) => p,
            None => return Ok(Vec::new()),
        };
        let mut xml = match xml_reader(&mut self.zip, &comments_path) {
            None => {
                warn!("comments part '{comments_path}' referenced but missing");
                return Ok(Vec::new());
            }
            Some(x) => x?,
        };

        let mut comments = Vec::new();
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"comment" => {
                    let pos = match get_attribute(e.attributes(), QName(b"ref"))? {
                        Some(r) => get_row_column(r)?,
                        None => return Err(XlsxError::Unexpected("comment without a 'ref'")),
                    };
                    if let Some(text) = read_string(&mut xml, e.name())? {
                        comments.push(Cell::new(pos, text));
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"comments" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("comments")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(comments)
    }

    fn sheet_path(&self, name: &str) -> Result<&str, XlsxError> {
        self.sheets
            .iter()
            .find(|&(n, _)| n == name)
            .map(|(_, p)| p.as_str())
            .ok_or_else(|| XlsxError::WorksheetNotFound(name.into()))
    }

    /// Resolves the comments part of a sheet through the sheet's own
    /// relationships file, if it has one.
    fn comments_path(&mut self, sheet_path: &str) -> Result<Option<String>, XlsxError> {
        let last_folder_index = sheet_path
            .rfind('/')
            .ok_or(XlsxError::Unexpected("sheet path is not in a folder"))?;
        let (base_folder, file_name) = sheet_path.split_at(last_folder_index);
        let rel_path = format!("{base_folder}/_rels{file_name}.rels");

        let mut xml = match xml_reader(&mut self.zip, &rel_path) {
            None => return Ok(None),
            Some(x) => x?,
        };
        let mut buf = Vec::with_capacity(64);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                    let mut target = String::new();
                    let mut is_comments = false;
                    for a in e.attributes() {
                        match a? {
                            Attribute {
                                key: QName(b"Target"),
                                value: v,
                            } => target = xml.decoder().decode(&v)?.into_owned(),
                            Attribute {
                                key: QName(b"Type"),
                                value: v,
                            } => is_comments = &*v == COMMENTS_RELATIONSHIP_TYPE.as_bytes(),
                            _ => (),
                        }
                    }
                    if is_comments && !target.is_empty() {
                        return Ok(Some(resolve_relative_target(base_folder, &target)));
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Relationships" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("Relationships")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(None)
    }

    fn read_shared_strings(&mut self) -> Result<(), XlsxError> {
        let mut xml = match xml_reader(&mut self.zip, "xl/sharedStrings.xml") {
            None => return Ok(()),
            Some(x) => x?,
        };
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"si" => {
                    if let Some(s) = read_string(&mut xml, e.name())? {
                        self.strings.push(s);
                    } else {
                        // empty shared string still occupies an index
                        self.strings.push(String::new());
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"sst" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("sst")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(())
    }

    fn read_relationships(&mut self) -> Result<BTreeMap<Vec<u8>, String>, XlsxError> {
        let mut xml = match xml_reader(&mut self.zip, "xl/_rels/workbook.xml.rels") {
            None => {
                return Err(XlsxError::FileNotFound(
                    "xl/_rels/workbook.xml.rels".to_string(),
                ));
            }
            Some(x) => x?,
        };
        let mut relationships = BTreeMap::new();
        let mut buf = Vec::with_capacity(64);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                    let mut id = Vec::new();
                    let mut target = String::new();
                    for a in e.attributes() {
                        match a? {
                            Attribute {
                                key: QName(b"Id"),
                                value: v,
                            } => id.extend_from_slice(&v),
                            Attribute {
                                key: QName(b"Target"),
                                value: v,
                            } => target = xml.decoder().decode(&v)?.into_owned(),
                            _ => (),
                        }
                    }
                    relationships.insert(id, target);
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Relationships" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("Relationships")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(relationships)
    }

    fn read_workbook(
        &mut self,
        relationships: &BTreeMap<Vec<u8>, String>,
    ) -> Result<(), XlsxError> {
        let mut xml = match xml_reader(&mut self.zip, "xl/workbook.xml") {
            None => return Ok(()),
            Some(x) => x?,
        };
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                    let mut name = String::new();
                    let mut path = String::new();
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a {
                            Attribute {
                                key: QName(b"name"),
                                ..
                            } => {
                                name = a.decode_and_unescape_value(xml.decoder())?.to_string();
                            }
                            Attribute {
                                key: QName(b"r:id"),
                                value: v,
                            }
                            | Attribute {
                                key: QName(b"relationships:id"),
                                value: v,
                            } => {
                                let r = &relationships
                                    .get(&*v)
                                    .ok_or(XlsxError::RelationshipNotFound)?[..];
                                // target may have pre-pended "/xl/" or "xl/" path;
                                // strip if present
                                path = if r.starts_with("/xl/") {
                                    r[1..].to_string()
                                } else if r.starts_with("xl/") {
                                    r.to_string()
                                } else {
                                    format!("xl/{r}")
                                };
                            }
                            _ => (),
                        }
                    }
                    self.sheets.push((name, path));
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"workbook" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("workbook")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(())
    }
}

/// read sheetData node, accumulating used cells
fn read_sheet_data<RS: Read + Seek>(
    xml: &mut XlReader<'_, RS>,
    strings: &[String],
    cells: &mut Vec<Cell<Data>>,
) -> Result<(), XlsxError> {
    let mut row_index = 0;
    let mut col_index = 0;
    let mut buf = Vec::with_capacity(1024);
    let mut cell_buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref row_element)) if row_element.local_name().as_ref() == b"row" => {
                if let Some(range) = get_attribute(row_element.attributes(), QName(b"r"))? {
                    row_index = get_row(range)?;
                }
            }
            Ok(Event::End(ref row_element)) if row_element.local_name().as_ref() == b"row" => {
                row_index += 1;
                col_index = 0;
            }
            Ok(Event::Start(ref c_element)) if c_element.local_name().as_ref() == b"c" => {
                // extract all needed attributes in one pass
                let mut pos_attr = None;
                let mut type_attr = None;
                for a in c_element.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    let Cow::Borrowed(val) = a.value else {
                        continue;
                    };
                    match a.key {
                        QName(b"r") => pos_attr = Some(val),
                        QName(b"t") => type_attr = Some(val),
                        _ => {}
                    }
                }
                let pos = if let Some(range) = pos_attr {
                    let (row, col) = get_row_column(range)?;
                    col_index = col;
                    (row, col)
                } else {
                    (row_index, col_index)
                };
                let mut value = Data::Empty;
                loop {
                    cell_buf.clear();
                    match xml.read_event_into(&mut cell_buf) {
                        Ok(Event::Start(ref e)) => {
                            value = read_value(xml, e.local_name().as_ref() == b"is", strings, type_attr)?;
                        }
                        Ok(Event::End(ref e)) if e.local_name().as_ref() == b"c" => break,
                        Ok(Event::Eof) => return Err(XlsxError::XmlEof("c")),
                        Err(e) => return Err(XlsxError::Xml(e)),
                        _ => (),
                    }
                }
                col_index += 1;
                if value != Data::Empty {
                    cells.push(Cell::new(pos, value));
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"sheetData" => return Ok(()),
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("sheetData")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
}

/// appends the character named by a general reference event (`&#N;` or a
/// predefined entity such as `&lt;`) to `out`
fn push_general_ref(out: &mut String, r: &BytesRef<'_>) -> Result<(), XlsxError> {
    if let Some(ch) = r.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    match resolve_predefined_entity(&r.decode()?) {
        Some(s) => {
            out.push_str(s);
            Ok(())
        }
        None => Err(XlsxError::Unexpected("Unknown entity reference in text")),
    }
}

/// reads the contents of an `<is>` or `<v>` cell child
fn read_value<RS: Read + Seek>(
    xml: &mut XlReader<'_, RS>,
    is_inline_string: bool,
    strings: &[String],
    type_attr: Option<&[u8]>,
) -> Result<Data, XlsxError> {
    if is_inline_string {
        return Ok(read_string(xml, QName(b"is"))?.map_or(Data::Empty, Data::String));
    }

    // <v> (or a formula node we skip up to its value)
    let mut v = String::new();
    let mut v_buf = Vec::new();
    loop {
        v_buf.clear();
        match xml.read_event_into(&mut v_buf)? {
            Event::Text(t) => v.push_str(&t.xml_content()?),
            Event::GeneralRef(r) => push_general_ref(&mut v, &r)?,
            Event::End(_) => break,
            Event::Eof => return Err(XlsxError::XmlEof("v")),
            _ => (),
        }
    }
    read_v(v, strings, type_attr)
}

/// interprets the raw `<v>` text according to the cell 't' attribute
fn read_v(v: String, strings: &[String], type_attr: Option<&[u8]>) -> Result<Data, XlsxError> {
    match type_attr {
        Some(b"s") => {
            if v.is_empty() {
                return Ok(Data::Empty);
            }
            // cell value is an index into the shared string table
            let idx = atoi_simd::parse::<usize>(v.as_bytes()).unwrap_or(0);
            match strings.get(idx) {
                Some(s) => Ok(Data::String(s.clone())),
                None => Err(XlsxError::Unexpected(
                    "Cell string index not found in shared strings table",
                )),
            }
        }
        Some(b"str") => Ok(Data::String(v)),
        Some(b"b") => Ok(Data::Bool(v != "0")),
        Some(b"e") => Ok(Data::Error(v.parse()?)),
        Some(b"d") => Ok(Data::DateTimeIso(v)),
        Some(b"n") | None => {
            if v.is_empty() {
                Ok(Data::Empty)
            } else {
                // try float first, fall back to string when the type is
                // unknown and the value is not numeric
                match fast_float2::parse::<f64, _>(v.as_bytes()) {
                    Ok(n) => Ok(Data::Float(n)),
                    Err(_) if type_attr.is_none() => Ok(Data::String(v)),
                    Err(_) => v.parse::<f64>().map(Data::Float).map_err(XlsxError::ParseFloat),
                }
            }
        }
        Some(t) => {
            let t = std::str::from_utf8(t).unwrap_or("<utf8 error>").to_string();
            Err(XlsxError::CellTAttribute(t))
        }
    }
}

fn xml_reader<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    path: &str,
) -> Option<Result<XlReader<'a, RS>, XlsxError>> {
    let actual_path = zip
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(path))?
        .to_owned();
    match zip.by_name(&actual_path) {
        Ok(f) => {
            let mut r = XmlReader::from_reader(BufReader::new(f));
            let config = r.config_mut();
            config.check_end_names = false;
            config.trim_text(false);
            config.check_comments = false;
            config.expand_empty_elements = true;
            Some(Ok(r))
        }
        Err(ZipError::FileNotFound) => None,
        Err(e) => Some(Err(e.into())),
    }
}

/// search through an Element's attributes for the named one
pub(crate) fn get_attribute<'a>(
    atts: Attributes<'a>,
    n: QName<'_>,
) -> Result<Option<&'a [u8]>, XlsxError> {
    for a in atts {
        match a {
            Ok(Attribute {
                key,
                value: Cow::Borrowed(value),
            }) if key == n => return Ok(Some(value)),
            Err(e) => return Err(XlsxError::XmlAttr(e)),
            _ => {} // ignore other attributes
        }
    }
    Ok(None)
}

/// converts a text representation (e.g. "A6:G67") of a dimension into
/// 0-based (row, column) bounds
pub(crate) fn get_dimension(dimension: &[u8]) -> Result<Dimensions, XlsxError> {
    let parts: Vec<_> = dimension
        .split(|c| *c == b':')
        .map(get_row_column)
        .collect::<Result<Vec<_>, XlsxError>>()?;

    match parts.len() {
        0 => Err(XlsxError::DimensionCount(0)),
        1 => Ok(Dimensions {
            start: parts[0],
            end: parts[0],
        }),
        2 => {
            let rows = parts[1]
                .0
                .checked_sub(parts[0].0)
                .ok_or(XlsxError::Unexpected("dimension start row is past its end"))?;
            let columns = parts[1]
                .1
                .checked_sub(parts[0].1)
                .ok_or(XlsxError::Unexpected(
                    "dimension start column is past its end",
                ))?;
            if rows > MAX_ROWS {
                warn!("xlsx has more than maximum number of rows ({rows} > {MAX_ROWS})");
            }
            if columns > MAX_COLUMNS {
                warn!("xlsx has more than maximum number of columns ({columns} > {MAX_COLUMNS})");
            }
            Ok(Dimensions {
                start: parts[0],
                end: parts[1],
            })
        }
        len => Err(XlsxError::DimensionCount(len)),
    }
}

/// Converts a text range name into its position (row, column) (0 based index).
/// If the row or column component in the range is missing, an Error is returned.
pub(crate) fn get_row_column(range: &[u8]) -> Result<(u32, u32), XlsxError> {
    let (row, col) = get_row_and_optional_column(range)?;
    let col = col.ok_or(XlsxError::RangeWithoutColumnComponent)?;
    Ok((row, col))
}

/// Converts a text row name into its position (0 based index).
/// A column component, if present, is ignored.
pub(crate) fn get_row(range: &[u8]) -> Result<u32, XlsxError> {
    get_row_and_optional_column(range).map(|(row, _)| row)
}

/// Converts a text range name into its position (row, column) (0 based index).
/// If the column component in the range is missing, `None` is returned for
/// the column.
fn get_row_and_optional_column(range: &[u8]) -> Result<(u32, Option<u32>), XlsxError> {
    let (mut row, mut col) = (0, 0);
    let mut pow = 1;
    let mut readrow = true;
    for c in range.iter().rev() {
        match *c {
            c @ b'0'..=b'9' => {
                if readrow {
                    row += ((c - b'0') as u32) * pow;
                    pow *= 10;
                } else {
                    return Err(XlsxError::NumericColumn(c));
                }
            }
            c @ b'A'..=b'Z' => {
                if readrow {
                    if row == 0 {
                        return Err(XlsxError::RangeWithoutRowComponent);
                    }
                    pow = 1;
                    readrow = false;
                }
                col += ((c - b'A') as u32 + 1) * pow;
                pow *= 26;
            }
            c @ b'a'..=b'z' => {
                if readrow {
                    if row == 0 {
                        return Err(XlsxError::RangeWithoutRowComponent);
                    }
                    pow = 1;
                    readrow = false;
                }
                col += ((c - b'a') as u32 + 1) * pow;
                pow *= 26;
            }
            _ => return Err(XlsxError::Alphanumeric(*c)),
        }
    }
    let row = row
        .checked_sub(1)
        .ok_or(XlsxError::RangeWithoutRowComponent)?;
    Ok((row, col.checked_sub(1)))
}

/// attempts to read either a simple or richtext string
pub(crate) fn read_string<RS: Read + Seek>(
    xml: &mut XlReader<'_, RS>,
    closing: QName<'_>,
) -> Result<Option<String>, XlsxError> {
    let mut buf = Vec::with_capacity(1024);
    let mut val_buf = Vec::with_capacity(1024);
    let mut rich_buffer: Option<String> = None;
    let mut is_phonetic_text = false;
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"r" => {
                if rich_buffer.is_none() {
                    // use a buffer since richtext has multiples <r> and <t> for the same cell
                    rich_buffer = Some(String::new());
                }
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"rPh" => {
                is_phonetic_text = true;
            }
            Ok(Event::End(ref e)) if e.name() == closing => {
                return Ok(rich_buffer);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"rPh" => {
                is_phonetic_text = false;
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" && !is_phonetic_text => {
                val_buf.clear();
                let mut value = String::new();
                loop {
                    match xml.read_event_into(&mut val_buf)? {
                        Event::Text(t) => value.push_str(&t.xml_content()?),
                        Event::GeneralRef(r) => push_general_ref(&mut value, &r)?,
                        Event::End(end) if end.name() == e.name() => break,
                        Event::Eof => return Err(XlsxError::XmlEof("t")),
                        _ => (),
                    }
                }
                if let Some(ref mut s) = rich_buffer {
                    s.push_str(&value);
                } else {
                    // consume any remaining events up to expected closing tag
                    xml.read_to_end_into(closing, &mut val_buf)?;
                    return Ok(Some(value));
                }
            }
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
}

/// resolves a relationship target relative to the folder holding the part
/// that declares it
fn resolve_relative_target(base_folder: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix("../") {
        match base_folder.rfind('/') {
            Some(idx) => format!("{}/{}", &base_folder[..idx], stripped),
            None => stripped.to_string(),
        }
    } else if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("{base_folder}/{target}")
    }
}
