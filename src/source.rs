//! Line-oriented value source used to feed series from delimited text files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{trace, warn};

/// Error raised while reading values from a text source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read value source: {0}")]
    Io(#[from] io::Error),
    /// A field could not be parsed as a double.
    #[error("line {line}: cannot parse {value:?} as a number")]
    Parse { line: usize, value: String },
}

/// Reads one `f64` per line from a column of delimited text.
///
/// Blank lines and lines without the selected column are skipped. The
/// iterator returns `None` once the input is exhausted.
///
/// # Example
/// ```
/// use chimp::CsvSource;
///
/// let data = "2020-01-01,Berlin,3.5\n2020-01-02,Berlin,4.25\n";
/// let values: Vec<f64> = CsvSource::new(data.as_bytes())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(values, vec![3.5, 4.25]);
/// ```
#[derive(Debug)]
pub struct CsvSource<R> {
    reader: R,
    delimiter: char,
    column: usize,
    skip_header: bool,
    line: String,
    line_no: usize,
}

impl CsvSource<BufReader<File>> {
    /// Opens a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> CsvSource<R> {
    /// Reads the third comma-separated column.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            delimiter: ',',
            column: 2,
            skip_header: false,
            line: String::new(),
            line_no: 0,
        }
    }

    /// Selects the zero-based column holding the values.
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Ignores the first line of the input.
    pub fn with_header(mut self) -> Self {
        self.skip_header = true;
        self
    }

    /// Collects up to `n` values. A shorter block means the source is
    /// exhausted.
    pub fn next_block(&mut self, n: usize) -> Result<Vec<f64>, SourceError> {
        let mut block = Vec::with_capacity(n);
        while block.len() < n {
            match self.next() {
                Some(value) => block.push(value?),
                None => break,
            }
        }
        trace!(requested = n, read = block.len(), "read value block");
        Ok(block)
    }

    fn read_line(&mut self) -> Result<bool, SourceError> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        self.line_no += 1;
        Ok(n > 0)
    }
}

impl<R: BufRead> Iterator for CsvSource<R> {
    type Item = Result<f64, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_line() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
            if self.skip_header && self.line_no == 1 {
                continue;
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(field) = line.split(self.delimiter).nth(self.column) else {
                warn!(
                    line = self.line_no,
                    column = self.column,
                    "skipping line without value column"
                );
                continue;
            };
            let field = field.trim();
            return Some(field.parse::<f64>().map_err(|_| SourceError::Parse {
                line: self.line_no,
                value: field.to_string(),
            }));
        }
    }
}
