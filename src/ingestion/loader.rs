//! Delimited-text loader.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::error::{CoercionError, RecordError, TableError, TableResult};
use crate::schema::Schema;
use crate::table::Row;

use super::observability::{LoadObserver, LoadSeverity};

/// Options controlling how a delimited source is read.
///
/// Use [`Default`] for comma-separated text with a header record.
#[derive(Clone)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Quote byte.
    pub quote: u8,
    /// Whether the first record is a header that must list the schema's columns.
    pub has_header: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("delimiter", &char::from(self.delimiter))
            .field("quote", &char::from(self.quote))
            .field("has_header", &self.has_header)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

impl LoadOptions {
    /// Tab-separated text with a header record.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }
}

/// One-pass producer of [`Row`]s from a delimited source.
///
/// The header (if expected) is checked when the loader is created. Each subsequent record is
/// coerced through the schema on demand. After the first error the loader yields nothing more.
///
/// Every line of the source is a record, blank ones included. A blank line has zero fields, so
/// it is a row-shape error unless the schema has a single column, where it holds the empty
/// string. Records end at `\n`; a `\r` right before it is dropped.
pub struct Loader<R> {
    reader: csv::Reader<Tracked<R>>,
    raw: csv::ByteRecord,
    schema: Arc<Schema>,
    next_record: usize,
    // Blank lines the csv reader skipped ahead of the buffered record, not yet emitted.
    blank_lines: u64,
    buffered: bool,
    failed: bool,
}

enum Raw {
    Blank,
    Fields,
}

impl<R: Read> Loader<R> {
    pub fn new(reader: R, schema: Arc<Schema>, options: &LoadOptions) -> TableResult<Self> {
        // Headers are handled here so that a mismatch is reported against the schema, and
        // `flexible` so that ragged records surface as row-shape errors.
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .delimiter(options.delimiter)
            .quote(options.quote)
            .from_reader(Tracked::new(reader));

        let mut loader = Self {
            reader,
            raw: csv::ByteRecord::new(),
            schema,
            next_record: 1,
            blank_lines: 0,
            buffered: false,
            failed: false,
        };
        if options.has_header {
            if let Some(header) = loader.advance()? {
                loader.check_header(header)?;
                loader.next_record += 1;
            }
        }
        Ok(loader)
    }

    /// Move to the next record, or `None` at the end of input.
    fn advance(&mut self) -> TableResult<Option<Raw>> {
        loop {
            if self.blank_lines > 0 {
                self.blank_lines -= 1;
                return Ok(Some(Raw::Blank));
            }
            if std::mem::take(&mut self.buffered) {
                return Ok(Some(Raw::Fields));
            }

            let before = self.reader.position().line();
            let more = self.reader.read_byte_record(&mut self.raw)?;
            let consumed = self.reader.position().line() - before;

            // Lines consumed beyond those the record spans are empty lines the reader skipped.
            let spanned = if more {
                let embedded = self.raw.as_slice().iter().filter(|&&b| b == b'\n').count() as u64;
                embedded + u64::from(self.terminated())
            } else {
                0
            };
            self.blank_lines = consumed.saturating_sub(spanned);

            if more && self.raw.len() == 1 && &self.raw[0] == b"\r" {
                self.blank_lines += 1;
            } else {
                self.buffered = more;
            }
            if self.blank_lines == 0 && !self.buffered {
                return Ok(None);
            }
        }
    }

    /// Whether the record just read ended with a line break rather than at end of input.
    fn terminated(&self) -> bool {
        let src = self.reader.get_ref();
        let at_end = src.eof && self.reader.position().byte() == src.consumed;
        !at_end || src.last == Some(b'\n')
    }

    fn fields(&self) -> impl Iterator<Item = &[u8]> {
        let last = self.raw.len().saturating_sub(1);
        self.raw.iter().enumerate().map(move |(i, field)| match field {
            [head @ .., b'\r'] if i == last => head,
            field => field,
        })
    }

    fn check_header(&self, header: Raw) -> TableResult<()> {
        let found: Vec<String> = match header {
            Raw::Blank => Vec::new(),
            Raw::Fields => self
                .fields()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect(),
        };
        if found.iter().map(String::as_str).eq(self.schema.field_names()) {
            return Ok(());
        }
        Err(TableError::HeaderMismatch {
            expected: self.schema.field_names().map(str::to_owned).collect(),
            found,
        })
    }

    fn build_row(&self, raw: Raw) -> Result<Row, RecordError> {
        match raw {
            Raw::Blank if self.schema.len() == 1 => self.schema.build_row([""]),
            Raw::Blank => self.schema.build_row(std::iter::empty::<&str>()),
            Raw::Fields => {
                if self.raw.len() != self.schema.len() {
                    return Err(RecordError::Shape {
                        expected: self.schema.len(),
                        found: self.raw.len(),
                    });
                }
                let text = self
                    .fields()
                    .zip(self.schema.fields())
                    .map(|(bytes, field)| {
                        std::str::from_utf8(bytes).map_err(|e| {
                            CoercionError::new(&field.name, &String::from_utf8_lossy(bytes), e)
                        })
                    })
                    .collect::<Result<Vec<&str>, _>>()?;
                self.schema.build_row(text)
            }
        }
    }
}

impl<R: Read> Iterator for Loader<R> {
    type Item = TableResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let record = self.next_record;
        let row = match self.advance() {
            Ok(None) => return None,
            Ok(Some(raw)) => self.build_row(raw).map_err(|e| e.at(record)),
            Err(e) => Err(e),
        };
        self.next_record += 1;
        if row.is_err() {
            self.failed = true;
        }
        Some(row)
    }
}

/// Reader adapter that remembers how much input was read and how it ended.
struct Tracked<R> {
    inner: R,
    consumed: u64,
    last: Option<u8>,
    eof: bool,
}

impl<R> Tracked<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            last: None,
            eof: false,
        }
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.consumed += n as u64;
            self.last = Some(buf[n - 1]);
        } else if !buf.is_empty() {
            self.eof = true;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{LoadOptions, Loader};
    use crate::error::TableError;
    use crate::schema::{Field, Schema};
    use crate::types::{DataType, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                Field::new("name"),
                Field::typed("salary", DataType::Int64),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn yields_rows_lazily_in_source_order() {
        let input = "name,salary\na,1\nb,2\n";
        let mut loader = Loader::new(input.as_bytes(), schema(), &LoadOptions::default()).unwrap();
        let first = loader.next().unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("a")));
        let second = loader.next().unwrap().unwrap();
        assert_eq!(second.get("salary"), Some(&Value::Int64(2)));
        assert!(loader.next().is_none());
    }

    #[test]
    fn header_mismatch_is_reported_on_creation() {
        let input = "salary,name\n1,a\n";
        let err = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .err()
            .unwrap();
        match err {
            TableError::HeaderMismatch { expected, found } => {
                assert_eq!(expected, vec!["name", "salary"]);
                assert_eq!(found, vec!["salary", "name"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn headerless_source_numbers_records_from_one() {
        let opts = LoadOptions {
            has_header: false,
            ..Default::default()
        };
        let input = "a,1\nb\n";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &opts).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(TableError::RowShape { record: 2, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn stops_after_first_error() {
        let input = "name,salary\na,x\nb,2\n";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().record(), Some(2));
    }

    #[test]
    fn honours_custom_delimiter_and_quotes() {
        let input = "name\tsalary\n\"x\ty\"\t5\n";
        let rows: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::tsv())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows[0].get("name"), Some(&Value::from("x\ty")));
    }

    #[test]
    fn blank_line_is_an_empty_record() {
        let input = "name,salary\na,1\n\nb,2\n";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[1],
            Err(TableError::RowShape { record: 3, expected: 2, found: 0 })
        ));
    }

    #[test]
    fn blank_lines_count_towards_record_numbers() {
        let opts = LoadOptions {
            has_header: false,
            ..Default::default()
        };
        let one_column = Arc::new(
            Schema::new(vec![Field::typed("n", DataType::Int64).optional()]).unwrap(),
        );
        let results: Vec<_> = Loader::new("1\n\n\n2\nx\n".as_bytes(), one_column, &opts)
            .unwrap()
            .collect();
        assert_eq!(results.len(), 5);
        assert_eq!(results[1].as_ref().unwrap().get("n"), Some(&Value::Null));
        assert_eq!(results[3].as_ref().unwrap().get("n"), Some(&Value::Int64(2)));
        assert_eq!(results[4].as_ref().unwrap_err().record(), Some(5));
    }

    #[test]
    fn single_column_blank_line_is_an_empty_string() {
        let one_column = Arc::new(Schema::new(vec![Field::new("name")]).unwrap());
        let rows: Vec<_> = Loader::new("name\na\n\nb\n\n".as_bytes(), one_column, &LoadOptions::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.get("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["a", "", "b", ""]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let input = "name,salary\r\n\"a\",1\r\n\r\nb,2\r\n";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect();
        assert_eq!(results[0].as_ref().unwrap().get("salary"), Some(&Value::Int64(1)));
        assert!(matches!(
            results[1],
            Err(TableError::RowShape { record: 3, found: 0, .. })
        ));
    }

    #[test]
    fn multi_line_quoted_field_is_one_record() {
        let input = "name,salary\n\"line one\nline two\",1\n\nb,2\n";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect();
        assert_eq!(
            results[0].as_ref().unwrap().get("name"),
            Some(&Value::from("line one\nline two"))
        );
        assert_eq!(results[1].as_ref().unwrap_err().record(), Some(3));
    }

    #[test]
    fn unterminated_last_record_after_blank_line() {
        let input = "name,salary\na,1\n\nb,2";
        let results: Vec<_> = Loader::new(input.as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].as_ref().unwrap_err().record(), Some(3));

        let rows: Vec<_> = Loader::new("name,salary\na,1\nb,2".as_bytes(), schema(), &LoadOptions::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn leading_blank_line_fails_the_header_check() {
        let err = Loader::new("\nname,salary\n".as_bytes(), schema(), &LoadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, TableError::HeaderMismatch { found, .. } if found.is_empty()));
    }

    #[test]
    fn invalid_utf8_is_a_coercion_error_with_record_number() {
        let input: &[u8] = b"name,salary\na,1\nb\xff,2\n";
        let results: Vec<_> = Loader::new(input, schema(), &LoadOptions::default()).unwrap().collect();
        match &results[1] {
            Err(TableError::Coercion { record, source }) => {
                assert_eq!(*record, 3);
                assert_eq!(source.column, "name");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
