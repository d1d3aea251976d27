//! Delimited text → rows of string tokens.

use std::{collections::BTreeSet, fs, path::Path};

use tracing::debug;

use crate::{
    delimiter::Delimiter,
    error::{ConvertError, Result},
};

/// One retained data line. `line` is the 0-based physical line index, the
/// same frame header line numbers are declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub line: usize,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub rows: Vec<ParsedRow>,
    pub column_count: usize,
}

impl ParsedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Tokens of one column, in file order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.rows.iter().map(move |r| (r.line, r.tokens[index].as_str()))
    }
}

/// How the parser should treat a file.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub delimiter: Delimiter,
    pub header_lines: BTreeSet<usize>,
    /// Column count every row must match; the first data row decides when unset.
    pub expected_columns: Option<usize>,
}

impl ParseOptions {
    pub fn new(delimiter: Delimiter) -> Self {
        ParseOptions { delimiter, header_lines: BTreeSet::new(), expected_columns: None }
    }

    pub fn with_headers(mut self, lines: impl IntoIterator<Item = usize>) -> Self {
        self.header_lines.extend(lines);
        self
    }

    pub fn with_columns(mut self, count: usize) -> Self {
        self.expected_columns = Some(count);
        self
    }
}

pub fn parse_file(path: &Path, opts: &ParseOptions) -> Result<ParsedTable> {
    let content = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    let table = parse_str(&content, opts)?;
    if table.rows.is_empty() {
        return Err(ConvertError::EmptyData { path: path.to_path_buf() });
    }
    debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count,
        "parsed data file"
    );
    Ok(table)
}

/// Parse already-loaded text. Blank lines are skipped but keep their line
/// number, so header numbering stays in the physical-line frame.
pub fn parse_str(content: &str, opts: &ParseOptions) -> Result<ParsedTable> {
    let kept: Vec<(usize, &str)> = content
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .enumerate()
        .filter(|(n, l)| !opts.header_lines.contains(n) && !l.trim().is_empty())
        .collect();

    let tokenized = match opts.delimiter.csv_byte() {
        Some(byte) => split_with_csv(&kept, byte, &opts.delimiter)?,
        None => kept
            .iter()
            .map(|&(n, l)| (n, split_line(l, &opts.delimiter)))
            .collect(),
    };

    let mut expected = opts.expected_columns;
    let mut rows = Vec::with_capacity(tokenized.len());
    for (line, tokens) in tokenized {
        let want = *expected.get_or_insert(tokens.len());
        if tokens.len() != want {
            return Err(ConvertError::Parse {
                line: line + 1,
                delimiter: opts.delimiter.to_string(),
                expected: want,
                found: tokens.len(),
            });
        }
        rows.push(ParsedRow { line, tokens });
    }

    Ok(ParsedTable { rows, column_count: expected.unwrap_or(0) })
}

/// Whitespace runs or a multi-character literal separator.
fn split_line(line: &str, delimiter: &Delimiter) -> Vec<String> {
    match delimiter {
        Delimiter::Whitespace => line
            .split([' ', '\t'])
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        other => line
            .split(other.symbol())
            .map(|t| t.trim().to_string())
            .collect(),
    }
}

/// Single-byte separators go through the csv reader so quoted fields work.
/// Record start lines map back onto the physical line numbers.
fn split_with_csv(
    kept: &[(usize, &str)],
    byte: u8,
    delimiter: &Delimiter,
) -> Result<Vec<(usize, Vec<String>)>> {
    let blob = kept.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n");
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(byte)
        .quoting(!delimiter.is_quote())
        .trim(csv::Trim::All)
        .from_reader(blob.as_bytes());

    let mut out = Vec::with_capacity(kept.len());
    for result in rdr.records() {
        let rec = result?;
        let blob_line = rec.position().map(|p| p.line() as usize).unwrap_or(1);
        let line = kept
            .get(blob_line.saturating_sub(1))
            .map(|(n, _)| *n)
            .unwrap_or_default();
        out.push((line, rec.iter().map(str::to_string).collect()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
station A
time,lat,temp

0,10.5,21.3
1,10.6,21.4

2,10.7,21.9
";

    #[test]
    fn test_headers_and_blank_lines() {
        let opts = ParseOptions::new(Delimiter::Comma).with_headers([0, 1]);
        let table = parse_str(SAMPLE, &opts).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count, 3);
        // blank lines still count toward the physical line number
        let lines: Vec<_> = table.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 6]);
        assert_eq!(table.rows[2].tokens, vec!["2", "10.7", "21.9"]);
    }

    #[test]
    fn test_column_mismatch_reports_line_and_delimiter() {
        let text = "a,b,c\n1,2,3\n4,5\n";
        let opts = ParseOptions::new(Delimiter::Comma).with_headers([0]);
        match parse_str(text, &opts).unwrap_err() {
            ConvertError::Parse { line, delimiter, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(delimiter, "Comma");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_expected_columns_enforced_on_first_row() {
        let opts = ParseOptions::new(Delimiter::Comma).with_columns(4);
        assert!(matches!(
            parse_str("1,2,3\n", &opts),
            Err(ConvertError::Parse { line: 1, expected: 4, found: 3, .. })
        ));
    }

    #[test]
    fn test_whitespace_runs() {
        let text = "1   2\t\t3\n  4 5  6  \n";
        let table = parse_str(text, &ParseOptions::new(Delimiter::Whitespace)).unwrap();
        assert_eq!(table.rows[0].tokens, vec!["1", "2", "3"]);
        assert_eq!(table.rows[1].tokens, vec!["4", "5", "6"]);
    }

    #[test]
    fn test_literal_space_is_not_whitespace_mode() {
        // A comma file with padded fields must not be split on the spaces.
        let text = "1, 2 ,3\n";
        let table = parse_str(text, &ParseOptions::new(Delimiter::Comma)).unwrap();
        assert_eq!(table.rows[0].tokens, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_quote_character_as_delimiter() {
        let text = "a\"b\"c\n";
        let table = parse_str(text, &ParseOptions::new(Delimiter::DoubleQuote)).unwrap();
        assert_eq!(table.rows[0].tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted_comma_stays_in_field() {
        let text = "1,\"Woods Hole, MA\",3\n";
        let table = parse_str(text, &ParseOptions::new(Delimiter::Comma)).unwrap();
        assert_eq!(table.rows[0].tokens[1], "Woods Hole, MA");
    }

    #[test]
    fn test_multi_character_delimiter() {
        let text = "1::2::3\n";
        let opts = ParseOptions::new(Delimiter::Other("::".into()));
        let table = parse_str(text, &opts).unwrap();
        assert_eq!(table.rows[0].tokens, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "h\r\n1;2\r\n3;4\r\n";
        let opts = ParseOptions::new(Delimiter::Semicolon).with_headers([0]);
        let table = parse_str(text, &opts).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].tokens, vec!["3", "4"]);
    }
}
