//! Reader and writer configuration

/// Callback deciding whether a materialized record should be skipped when
/// reading through a [`SheetReader`](crate::SheetReader).
pub type SkipRecord = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Callback deciding whether a field would be quoted in a delimited
/// rendition. Carried for contract compatibility; cell storage never
/// quotes, so the result only feeds [`raw_record`](crate::SheetParser::raw_record).
pub type ShouldQuote = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration shared by [`SheetParser`](crate::SheetParser),
/// [`SheetReader`](crate::SheetReader) and [`SheetWriter`](crate::SheetWriter).
///
/// The defaults mirror a plain comma-delimited record contract: header
/// record expected, no offsets, injection sanitization off.
pub struct Config {
    /// Worksheet to operate on. `None` selects the first sheet when
    /// reading and names the sheet `"export"` when writing.
    pub sheet_name: Option<String>,
    /// Delimiter used when a whole record is rendered as one string.
    pub delimiter: char,
    /// Whether the first record is a header record.
    pub has_header_record: bool,
    /// Escape fields whose first character could be interpreted as a
    /// formula by a spreadsheet application.
    pub sanitize_for_injection: bool,
    /// Leading characters considered dangerous when
    /// [`sanitize_for_injection`](Config::sanitize_for_injection) is set.
    pub injection_characters: Vec<char>,
    /// Character prefixed to a dangerous field.
    pub injection_escape_character: char,
    /// Keep the destination stream open (and recoverable) after the
    /// writer finishes.
    pub leave_open: bool,
    /// Number of physical rows skipped above the logical grid.
    pub row_offset: u32,
    /// Number of physical columns skipped left of the logical grid.
    pub column_offset: u16,
    /// Cell number format applied to date values written through the
    /// typed write path.
    pub date_format: String,
    /// Optional cell number format applied to numeric values written
    /// through the typed write path.
    pub number_format: Option<String>,
    /// Record skip predicate, applied by [`SheetReader`](crate::SheetReader).
    pub should_skip_record: Option<SkipRecord>,
    /// Field quote predicate, applied by
    /// [`raw_record`](crate::SheetParser::raw_record).
    pub should_quote: Option<ShouldQuote>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheet_name: None,
            delimiter: ',',
            has_header_record: true,
            sanitize_for_injection: false,
            injection_characters: vec!['=', '+', '-', '@'],
            injection_escape_character: '\t',
            leave_open: false,
            row_offset: 0,
            column_offset: 0,
            date_format: "yyyy-mm-dd".to_string(),
            number_format: None,
            should_skip_record: None,
            should_quote: None,
        }
    }
}

impl Config {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the worksheet by name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Sets the record delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Declares whether the first record is a header record
    pub fn has_header_record(mut self, has_header: bool) -> Self {
        self.has_header_record = has_header;
        self
    }

    /// Enables formula injection sanitization on write
    pub fn sanitize_for_injection(mut self, sanitize: bool) -> Self {
        self.sanitize_for_injection = sanitize;
        self
    }

    /// Keeps the destination stream recoverable after the writer finishes
    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    /// Shifts the logical grid down by `rows` physical rows
    pub fn row_offset(mut self, rows: u32) -> Self {
        self.row_offset = rows;
        self
    }

    /// Shifts the logical grid right by `columns` physical columns
    pub fn column_offset(mut self, columns: u16) -> Self {
        self.column_offset = columns;
        self
    }

    /// Sets the number format used for typed date values
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Sets the number format used for typed numeric values
    pub fn number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    /// Installs a record skip predicate
    pub fn should_skip_record(
        mut self,
        f: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_skip_record = Some(Box::new(f));
        self
    }

    /// Installs a field quote predicate
    pub fn should_quote(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.should_quote = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sheet_name", &self.sheet_name)
            .field("delimiter", &self.delimiter)
            .field("has_header_record", &self.has_header_record)
            .field("sanitize_for_injection", &self.sanitize_for_injection)
            .field("injection_characters", &self.injection_characters)
            .field("injection_escape_character", &self.injection_escape_character)
            .field("leave_open", &self.leave_open)
            .field("row_offset", &self.row_offset)
            .field("column_offset", &self.column_offset)
            .field("date_format", &self.date_format)
            .field("number_format", &self.number_format)
            .field(
                "should_skip_record",
                &self.should_skip_record.as_ref().map(|_| ".."),
            )
            .field("should_quote", &self.should_quote.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains() {
        let config = Config::new()
            .sheet_name("data")
            .delimiter(';')
            .has_header_record(false)
            .row_offset(2)
            .column_offset(1)
            .leave_open(true);
        assert_eq!(config.sheet_name.as_deref(), Some("data"));
        assert_eq!(config.delimiter, ';');
        assert!(!config.has_header_record);
        assert_eq!(config.row_offset, 2);
        assert_eq!(config.column_offset, 1);
        assert!(config.leave_open);
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.sheet_name.is_none());
        assert_eq!(config.delimiter, ',');
        assert!(config.has_header_record);
        assert!(!config.sanitize_for_injection);
        assert_eq!(config.injection_characters, ['=', '+', '-', '@']);
        assert_eq!(config.injection_escape_character, '\t');
        assert_eq!(config.date_format, "yyyy-mm-dd");
        assert!(config.number_format.is_none());
    }
}
