use std::io::Cursor;
use std::path::PathBuf;

use gridrecord::{Config, Data, Error, SheetParser, SheetReader, SheetWriter};
use rstest::rstest;

/// Builds an in-memory workbook holding `rows` as plain strings.
fn xlsx(rows: &[&[&str]]) -> Cursor<Vec<u8>> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    Cursor::new(workbook.save_to_buffer().unwrap())
}

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("gridrecord-{}-{name}.xlsx", std::process::id()));
    path
}

#[test]
fn advances_match_data_rows_under_header() {
    let _ = env_logger::builder().is_test(true).try_init();
    let bytes = xlsx(&[
        &["id", "name"],
        &["1", "alice"],
        &["2", "bob"],
        &["3", "carol"],
    ]);
    let mut reader = SheetReader::new(bytes, Config::default()).unwrap();

    let mut records = 0;
    while reader.read().unwrap() {
        records += 1;
        // header occupies physical row 1, data row k sits at 1 + k
        assert_eq!(reader.raw_row(), 1 + records);
    }
    assert_eq!(records, 3);
    assert_eq!(reader.headers().unwrap(), ["id", "name"]);
}

#[test]
fn writer_roundtrips_through_parser() {
    let records: &[&[&str]] = &[
        &["name", "amount", "notes"],
        &["widget", "12.5", "ok"],
        &["gadget", "7", "backorder"],
    ];

    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    for record in records {
        for field in *record {
            writer.write_field(field, false).unwrap();
        }
        writer.next_record().unwrap();
    }
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert_eq!(parser.count(), 3);
    for expected in records {
        assert!(parser.advance().unwrap());
        assert_eq!(parser.record().unwrap(), *expected);
    }
    assert!(!parser.advance().unwrap());
}

#[test]
fn empty_fields_leave_cells_absent() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    // middle field empty, trailing fields of the widest record empty
    writer.write_field("a", false).unwrap();
    writer.write_field("", false).unwrap();
    writer.write_field("c", false).unwrap();
    writer.next_record().unwrap();
    writer.write_field("d", false).unwrap();
    writer.write_field("", false).unwrap();
    writer.write_field("", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    // the used bounding box still spans 3 columns because of row 1
    assert_eq!(parser.count(), 3);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["a", "", "c"]);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["d", "", ""]);
    assert!(!parser.advance().unwrap());
}

#[test]
fn trailing_empty_columns_never_widen_the_grid() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    writer.write_field("a", false).unwrap();
    writer.write_field("b", false).unwrap();
    writer.write_field("", false).unwrap();
    writer.write_field("", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let parser = SheetParser::new(buffer, Config::default()).unwrap();
    // empty fields were skipped, not written as empty strings
    assert_eq!(parser.count(), 2);
}

#[test]
fn matching_offsets_reproduce_the_unoffset_roundtrip() {
    let records: &[&[&str]] = &[&["h1", "h2"], &["a", "b"], &["c", "d"]];

    let buffer = Cursor::new(Vec::new());
    let write_config = Config::new().leave_open(true).row_offset(2).column_offset(1);
    let mut writer = SheetWriter::new(buffer, write_config).unwrap();
    for record in records {
        for field in *record {
            writer.write_field(field, false).unwrap();
        }
        writer.next_record().unwrap();
    }
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let read_config = Config::new().row_offset(2).column_offset(1);
    let mut parser = SheetParser::new(buffer, read_config).unwrap();
    for expected in records {
        assert!(parser.advance().unwrap());
        assert_eq!(parser.record().unwrap(), *expected);
    }
    assert!(!parser.advance().unwrap());
}

#[test]
fn mismatched_offsets_shift_deterministically() {
    let buffer = Cursor::new(Vec::new());
    let write_config = Config::new().leave_open(true).row_offset(2).column_offset(1);
    let mut writer = SheetWriter::new(buffer, write_config).unwrap();
    writer.write_field("a", false).unwrap();
    writer.write_field("b", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    // no read offset: the data sits at physical row 3, columns 2..3, so the
    // first two logical rows are blank and fields shift right by one
    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert_eq!(parser.count(), 2);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["", ""]);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["", ""]);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["", "a"]);
    assert_eq!(parser.raw_row(), 3);
    assert!(!parser.advance().unwrap());
}

#[test]
fn empty_sheet_reads_as_exhausted() {
    let bytes = xlsx(&[]);
    let mut reader = SheetReader::new(bytes, Config::default()).unwrap();
    assert!(!reader.read().unwrap());
    assert!(reader.headers().is_none());
}

#[test]
fn header_only_sheet_yields_zero_records() {
    let bytes = xlsx(&[&["id", "name"]]);
    let mut reader = SheetReader::new(bytes, Config::default()).unwrap();
    assert!(!reader.read().unwrap());
    assert_eq!(reader.headers().unwrap(), ["id", "name"]);
}

#[test]
fn skipped_blank_rows_diverge_logical_from_raw() {
    let bytes = xlsx(&[
        &["id", "name"],
        &["1", "alice"],
        &["", ""],
        &["2", "bob"],
        &["3", "carol"],
    ]);
    let config = Config::new()
        .should_skip_record(|record: &[String]| record.iter().all(String::is_empty));
    let mut reader = SheetReader::new(bytes, config).unwrap();

    let mut names = Vec::new();
    while reader.read().unwrap() {
        names.push(reader.field(1).unwrap().to_string());
    }
    assert_eq!(names, ["alice", "bob", "carol"]);
    // the blank physical row was consumed even though it surfaced no record
    assert_eq!(reader.raw_row(), 5);
    assert_eq!(reader.row(), 5);
}

#[test]
fn field_by_name_uses_the_header_record() {
    let bytes = xlsx(&[&["id", "name"], &["1", "alice"]]);
    let mut reader = SheetReader::new(bytes, Config::default()).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.field_by_name("name"), Some("alice"));
    assert_eq!(reader.field_by_name("id"), Some("1"));
    assert_eq!(reader.field_by_name("missing"), None);
}

#[test]
fn leave_open_keeps_the_stream_recoverable() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    writer.write_field("x", false).unwrap();
    writer.finish().unwrap();
    let buffer = writer.into_inner().expect("stream kept open");
    assert!(!buffer.get_ref().is_empty());

    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::default()).unwrap();
    writer.write_field("x", false).unwrap();
    writer.finish().unwrap();
    assert!(writer.into_inner().is_none());
}

#[test]
fn dropping_an_unfinished_writer_persists_to_its_path() {
    let path = temp_path("drop-persists");
    {
        let mut writer = SheetWriter::from_path(&path).unwrap();
        writer.write_field("late", false).unwrap();
        writer.next_record().unwrap();
        // no finish, the drop backstop persists
    }
    let mut parser = SheetParser::open(&path).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["late"]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn comments_roundtrip() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    writer.write_comment("header note").unwrap();
    writer.write_field("id", false).unwrap();
    writer.write_field("name", false).unwrap();
    writer.next_record().unwrap();
    writer.write_field("1", false).unwrap();
    writer.write_comment("flagged").unwrap();
    writer.write_field("alice", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(parser.comment(0), Some("header note"));
    assert_eq!(parser.comment(1), None);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.comment(1), Some("flagged"));
    assert_eq!(parser.comment_at(2, 2), Some("flagged"));
    assert_eq!(parser.comment_at(1, 1), Some("header note"));
}

#[test]
fn typed_fields_keep_their_cell_type() {
    let buffer = Cursor::new(Vec::new());
    let config = Config::new().leave_open(true).number_format("0.00");
    let mut writer = SheetWriter::new(buffer, config).unwrap();
    writer.write_field_typed(&Data::Int(7)).unwrap();
    writer.write_field_typed(&Data::Float(12.5)).unwrap();
    writer.write_field_typed(&Data::Bool(true)).unwrap();
    writer
        .write_field_typed(&Data::String("plain".into()))
        .unwrap();
    writer.write_field_typed(&Data::Empty).unwrap();
    writer
        .write_field_typed(&Data::DateTimeIso("2024-03-01".into()))
        .unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(parser.field(0), Some("7"));
    assert_eq!(parser.field(1), Some("12.5"));
    assert_eq!(parser.field(2), Some("true"));
    assert_eq!(parser.field(3), Some("plain"));
    // the empty slot advanced the cursor without writing a cell
    assert_eq!(parser.field(4), Some(""));
    // the date landed as a serial number cell carrying a date format
    let serial: f64 = parser.field(5).unwrap().parse().unwrap();
    assert!(serial > 40_000.0);
}

#[rstest]
#[case("=1+2")]
#[case("+SUM(A1:A2)")]
#[case("-3")]
#[case("@cmd")]
fn injection_sanitization_prefixes_dangerous_fields(#[case] field: &str) {
    let buffer = Cursor::new(Vec::new());
    let config = Config::new().leave_open(true).sanitize_for_injection(true);
    let mut writer = SheetWriter::new(buffer, config).unwrap();
    writer.write_field(field, false).unwrap();
    writer.write_field("safe", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(parser.field(0), Some(format!("\t{field}").as_str()));
    assert_eq!(parser.field(1), Some("safe"));
}

#[rstest]
#[case(',')]
#[case(';')]
fn raw_record_joins_with_the_configured_delimiter(#[case] delimiter: char) {
    let bytes = xlsx(&[&["a", "b", "c"]]);
    let config = Config::new()
        .delimiter(delimiter)
        .should_quote(|field: &str| field == "b");
    let mut parser = SheetParser::new(bytes, config).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(
        parser.raw_record().unwrap(),
        format!("a{delimiter}\"b\"{delimiter}c")
    );
}

#[test]
fn named_sheet_selection() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.add_worksheet().set_name("first").unwrap();
    let second = workbook.add_worksheet();
    second.set_name("data").unwrap();
    second.write_string(0, 0, "payload").unwrap();
    let bytes = Cursor::new(workbook.save_to_buffer().unwrap());

    let config = Config::new().sheet_name("data");
    let mut parser = SheetParser::new(bytes, config).unwrap();
    assert_eq!(parser.sheet_names(), ["first", "data"]);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["payload"]);
}

#[test]
fn writer_names_its_sheet_from_config() {
    let buffer = Cursor::new(Vec::new());
    let config = Config::new().leave_open(true).sheet_name("ledger");
    let mut writer = SheetWriter::new(buffer, config).unwrap();
    writer.write_field("x", false).unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert_eq!(parser.sheet_names(), ["ledger"]);
}

#[test]
fn sizing_helpers_pass_through() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    writer.write_field("wide column", false).unwrap();
    writer.set_column_width(1, 40.0).unwrap();
    writer.set_row_height(1, 22.0).unwrap();
    writer.adjust_to_contents().unwrap();
    assert!(matches!(
        writer.set_column_width(0, 10.0),
        Err(Error::Msg(_))
    ));
    writer.finish().unwrap();
    assert!(!writer.into_inner().unwrap().get_ref().is_empty());
}

#[tokio::test]
async fn async_variants_match_their_sync_counterparts() {
    let records: &[&[&str]] = &[&["h"], &["a"], &["b"]];

    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    for record in records {
        for field in *record {
            writer.write_field(field, false).unwrap();
        }
        writer.next_record_async().await.unwrap();
    }
    writer.flush_async().await.unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    let mut seen = Vec::new();
    while parser.advance_async().await.unwrap() {
        seen.push(parser.record().unwrap().to_vec());
    }
    assert_eq!(seen, [["h"], ["a"], ["b"]]);

    buffer = parser.into_inner();
    buffer.set_position(0);
    let mut reader = SheetReader::new(buffer, Config::default()).unwrap();
    let mut count = 0;
    while reader.read_async().await.unwrap() {
        count += 1;
    }
    assert_eq!(count, 2);
}

#[test]
fn xml_escaped_text_roundtrips() {
    let buffer = Cursor::new(Vec::new());
    let mut writer = SheetWriter::new(buffer, Config::new().leave_open(true)).unwrap();
    writer.write_field("a<b&c>\"d\"", false).unwrap();
    writer.write_comment("5 < 6 & 7 > 2").unwrap();
    writer.write_field("x", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();
    let mut buffer = writer.into_inner().unwrap();
    buffer.set_position(0);

    let mut parser = SheetParser::new(buffer, Config::default()).unwrap();
    assert!(parser.advance().unwrap());
    assert_eq!(parser.field(0), Some("a<b&c>\"d\""));
    assert_eq!(parser.field(1), Some("x"));
    assert_eq!(parser.comment(0), Some("5 < 6 & 7 > 2"));
}

#[test]
fn skipping_under_a_row_offset_keeps_raw_row_physical() {
    let bytes = xlsx(&[
        &["TITLE"],
        &["id", "name"],
        &["1", "alice"],
        &["", ""],
        &["2", "bob"],
    ]);
    let config = Config::new()
        .row_offset(1)
        .should_skip_record(|record: &[String]| record.iter().all(String::is_empty));
    let mut reader = SheetReader::new(bytes, config).unwrap();

    let mut names = Vec::new();
    while reader.read().unwrap() {
        names.push(reader.field(1).unwrap().to_string());
    }
    assert_eq!(names, ["alice", "bob"]);
    // 2 records surfaced, but the last consumed physical row is 5:
    // title skipped by the offset, header, data, blank, data
    assert_eq!(reader.raw_row(), 5);
    assert_eq!(reader.row(), 4);
}

#[test]
fn record_width_ignores_leading_blank_columns() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    // data lives in columns B and C, column A is untouched
    sheet.write_string(0, 1, "b1").unwrap();
    sheet.write_string(0, 2, "c1").unwrap();
    sheet.write_string(1, 1, "b2").unwrap();
    let bytes = Cursor::new(workbook.save_to_buffer().unwrap());

    let mut parser = SheetParser::new(bytes, Config::default()).unwrap();
    // width comes from the used bounding box, but fields are still read
    // starting at column A
    assert_eq!(parser.count(), 2);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["", "b1"]);
    assert!(parser.advance().unwrap());
    assert_eq!(parser.record().unwrap(), ["", "b2"]);
    assert!(!parser.advance().unwrap());
}

#[test]
fn path_writer_persists_on_finish() {
    let path = temp_path("finish-persists");
    let mut writer = SheetWriter::from_path(&path).unwrap();
    writer.write_field("id", false).unwrap();
    writer.write_field("name", false).unwrap();
    writer.next_record().unwrap();
    writer.write_field("1", false).unwrap();
    writer.write_field("alice", false).unwrap();
    writer.next_record().unwrap();
    writer.finish().unwrap();

    let mut reader = SheetReader::open(&path).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.field_by_name("name"), Some("alice"));
    assert!(!reader.read().unwrap());
    std::fs::remove_file(&path).ok();
}
