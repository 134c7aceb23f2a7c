//! Character-level splitter for delimiter-separated text.
//!
//! Cells end at the delimiter and rows end at CR, LF or CRLF, unless the
//! character sits inside a quoted cell. Inside quotes a doubled quote stands
//! for one literal quote. Spaces before the first character of an unquoted
//! cell are dropped. An unterminated quote swallows the rest of the input
//! instead of failing.

use std::{iter::Peekable, str::Chars};

const QUOTE: char = '"';

/// Iterator over the rows of a delimited text buffer.
///
/// # Examples
/// ```
/// use geodata_core::tokenizer::DelimitedTokenizer;
///
/// let rows: Vec<Vec<String>> =
///     DelimitedTokenizer::new("a,\"b,\"\"c\"\"\"\r\nd,e", ',').collect();
/// assert_eq!(rows, vec![vec!["a", "b,\"c\""], vec!["d", "e"]]);
/// ```
#[derive(Debug, Clone)]
pub struct DelimitedTokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    delimiter: char,
}

impl<'a> DelimitedTokenizer<'a> {
    /// Tokenize `text` using `delimiter` between cells.
    #[must_use]
    pub fn new(text: &'a str, delimiter: char) -> Self {
        Self {
            chars: text.chars().peekable(),
            delimiter,
        }
    }

    /// Read one cell. Returns the cell and whether it closed its row.
    fn read_cell(&mut self) -> (String, bool) {
        let mut cell = String::new();
        while self.chars.next_if_eq(&' ').is_some() {}
        if self.chars.next_if_eq(&QUOTE).is_some() {
            self.read_quoted(&mut cell);
        }
        loop {
            match self.chars.next() {
                None => return (cell, true),
                Some(ch) if ch == self.delimiter => return (cell, false),
                Some('\r') => {
                    self.chars.next_if_eq(&'\n');
                    return (cell, true);
                }
                Some('\n') => return (cell, true),
                Some(ch) => cell.push(ch),
            }
        }
    }

    fn read_quoted(&mut self, cell: &mut String) {
        while let Some(ch) = self.chars.next() {
            if ch != QUOTE {
                cell.push(ch);
                continue;
            }
            if self.chars.next_if_eq(&QUOTE).is_some() {
                cell.push(QUOTE);
            } else {
                return;
            }
        }
    }
}

impl Iterator for DelimitedTokenizer<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chars.peek()?;
        let mut row = Vec::new();
        loop {
            let (cell, end_of_row) = self.read_cell();
            row.push(cell);
            if end_of_row {
                return Some(row);
            }
        }
    }
}

/// Quote a cell for output when it contains the delimiter, a quote or a
/// line break, or when it starts with a space. Embedded quotes are doubled.
///
/// # Examples
/// ```
/// use geodata_core::tokenizer::escape_cell;
///
/// assert_eq!(escape_cell("plain", ','), "plain");
/// assert_eq!(escape_cell("a,b", ','), "\"a,b\"");
/// assert_eq!(escape_cell("  Suite 4", ','), "\"  Suite 4\"");
/// assert_eq!(escape_cell("say \"hi\"", '|'), "\"say \"\"hi\"\"\"");
/// ```
#[must_use]
pub fn escape_cell(cell: &str, delimiter: char) -> String {
    let needs_quotes = cell.starts_with(' ')
        || cell
            .chars()
            .any(|ch| ch == delimiter || ch == QUOTE || ch == '\n' || ch == '\r');
    if needs_quotes {
        format!("\"{}\"", cell.replace(QUOTE, "\"\""))
    } else {
        cell.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn tokenize(text: &str, delimiter: char) -> Vec<Vec<String>> {
        DelimitedTokenizer::new(text, delimiter).collect()
    }

    #[rstest]
    #[case("a,b,c", ',', vec![vec!["a", "b", "c"]])]
    #[case("a\tb", '\t', vec![vec!["a", "b"]])]
    #[case("a|b|", '|', vec![vec!["a", "b", ""]])]
    #[case("a,b\nc,d\n", ',', vec![vec!["a", "b"], vec!["c", "d"]])]
    #[case("a\r\nb\rc", ',', vec![vec!["a"], vec!["b"], vec!["c"]])]
    #[case("   padded,  x", ',', vec![vec!["padded", "x"]])]
    #[case("1,Store B,,", ',', vec![vec!["1", "Store B", "", ""]])]
    fn splits_rows_and_cells(
        #[case] text: &str,
        #[case] delimiter: char,
        #[case] expected: Vec<Vec<&str>>,
    ) {
        assert_eq!(tokenize(text, delimiter), expected);
    }

    #[rstest]
    fn decodes_doubled_quotes() {
        assert_eq!(tokenize("\"a\"\"b\"", ','), vec![vec!["a\"b"]]);
    }

    #[rstest]
    fn quoted_cells_keep_delimiters_and_newlines() {
        let rows = tokenize("\"one,\ntwo\",three\nfour", ',');
        assert_eq!(rows, vec![vec!["one,\ntwo", "three"], vec!["four"]]);
    }

    #[rstest]
    fn spaces_before_quote_are_dropped() {
        assert_eq!(tokenize("a,  \"b,c\"", ','), vec![vec!["a", "b,c"]]);
    }

    #[rstest]
    fn unterminated_quote_reads_to_end() {
        let rows = tokenize("a,\"b,c\nd", ',');
        assert_eq!(rows, vec![vec!["a", "b,c\nd"]]);
    }

    #[rstest]
    fn empty_input_yields_no_rows() {
        assert!(tokenize("", ',').is_empty());
    }

    #[rstest]
    fn blank_line_yields_single_empty_cell() {
        assert_eq!(tokenize("a\n\nb", ','), vec![vec!["a"], vec![""], vec!["b"]]);
    }

    #[rstest]
    #[case(',')]
    #[case('\t')]
    #[case('|')]
    fn escaped_cells_tokenize_back(#[case] delimiter: char) {
        let cell = format!("x{delimiter}\"y\"\nz");
        let line = escape_cell(&cell, delimiter);
        assert_eq!(tokenize(&line, delimiter), vec![vec![cell]]);
    }

    #[rstest]
    #[case("  Suite 4 ")]
    #[case(" ")]
    fn leading_spaces_survive_escaping(#[case] cell: &str) {
        let line = escape_cell(cell, ',');
        assert!(line.starts_with('"'));
        assert_eq!(tokenize(&line, ','), vec![vec![cell]]);
    }

    proptest! {
        #[test]
        fn plain_cell_is_unchanged(cell in "[A-Za-z0-9_.;:/-][A-Za-z0-9 _.;:/-]{0,40}") {
            prop_assert_eq!(tokenize(&cell, ','), vec![vec![cell.clone()]]);
        }

        #[test]
        fn escape_then_tokenize_is_identity(cell in "[^\r]{1,40}") {
            let line = escape_cell(&cell, ',');
            prop_assert_eq!(tokenize(&line, ','), vec![vec![cell]]);
        }
    }
}
