//! Parser for delimiter-separated text with one or more tables.
//!
//! A table starts at a header line with at least two column names and runs
//! until the first blank line or unreadable line. The delimiter is guessed
//! per table from `;`, `,` and tab, in that order. Fields may be quoted with
//! `"`; inside quotes delimiters and line breaks are literal and `""` stands
//! for a single quote.

use std::sync::LazyLock;

use regex::Regex;

const DELIMITERS: [char; 3] = [';', ',', '\t'];

static LINE_ENDINGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").unwrap());
static HEADER_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?\s:_\-]+").unwrap());

/// Canonical form of a column name: `?`, `:`, `_`, `-` and whitespace
/// removed, upper-cased.
pub fn simplify_header_name(name: &str) -> String {
    HEADER_NOISE.replace_all(name, "").to_uppercase()
}

/// One data row, keyed by canonical column name in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Value of the named column, or `None` if the row is shorter than the
    /// header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn insert(&mut self, name: String, value: String) {
        if let Some(slot) = self.fields.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }
}

/// A header row and the records below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Canonical column names, including synthesized `FIELD_n` columns.
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn has_column(&self, name: &str) -> bool {
        self.header.iter().any(|column| column == name)
    }
}

/// Lazily yields the tables found in a text. Call [`TableParser::rewind`]
/// to scan the same text again.
#[derive(Debug, Clone)]
pub struct TableParser {
    text: String,
    pos: usize,
    delimiter: char,
    field_names: Vec<String>,
}

impl TableParser {
    pub fn new(input: &str) -> Self {
        Self {
            text: LINE_ENDINGS.replace_all(input, "\n").into_owned(),
            pos: 0,
            delimiter: DELIMITERS[0],
            field_names: Vec::new(),
        }
    }

    /// Restarts scanning at the beginning of the text.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Parses the next table, or returns `None` once no further header
    /// line can be found.
    pub fn next_table(&mut self) -> Option<Table> {
        loop {
            if self.at_end() {
                return None;
            }

            self.skip_empty_line();
            if !self.find_header() {
                self.skip_line();
                continue;
            }

            if self.at_end() {
                return None;
            }
            if self.field_names.iter().filter(|name| !name.is_empty()).count() < 2 {
                continue;
            }

            let mut records = Vec::new();
            while let Some(record) = self.parse_record() {
                records.push(record);
                if !self.eat('\n') {
                    break;
                }
            }

            return Some(Table {
                header: self.field_names.clone(),
                records,
            });
        }
    }

    /// Tries each delimiter on the current line. On success the cursor sits
    /// after the header's line break.
    fn find_header(&mut self) -> bool {
        let start = self.pos;
        for delimiter in DELIMITERS {
            self.delimiter = delimiter;
            self.pos = start;
            self.field_names = self.parse_header().unwrap_or_default();
            if self.field_names.len() > 1 && self.eat('\n') {
                return true;
            }
        }
        self.pos = start;
        false
    }

    fn parse_header(&mut self) -> Option<Vec<String>> {
        let mut name = self.parse_field()?;
        let mut names = Vec::new();
        loop {
            names.push(simplify_header_name(&name));
            if !self.eat(self.delimiter) {
                break;
            }
            match self.parse_field() {
                Some(next) => name = next,
                None => break,
            }
        }
        Some(names)
    }

    fn parse_record(&mut self) -> Option<Record> {
        if self.skip_empty_line() || self.at_end() {
            return None;
        }

        let mut field = self.parse_field()?;
        let mut record = Record::default();
        let mut index = 0;
        loop {
            let name = if let Some(name) = self.field_names.get(index) {
                name.clone()
            } else {
                let name = format!("FIELD_{}", index + 1);
                self.field_names.push(name.clone());
                name
            };
            record.insert(name, field);
            index += 1;

            if !self.eat(self.delimiter) {
                break;
            }
            match self.parse_field() {
                Some(next) => field = next,
                None => break,
            }
        }
        Some(record)
    }

    fn parse_field(&mut self) -> Option<String> {
        self.skip_blanks();

        let start = self.pos;
        if let Some(value) = self.parse_quoted() {
            return Some(value);
        }
        self.pos = start;

        let text = self.scan_text();
        if !text.is_empty() {
            return Some(text);
        }

        match self.peek() {
            None | Some('\n') => Some(String::new()),
            Some(c) if c == self.delimiter => Some(String::new()),
            Some(_) => None,
        }
    }

    fn parse_quoted(&mut self) -> Option<String> {
        if !self.eat('"') {
            return None;
        }

        let mut value = String::new();
        loop {
            let text = self.scan_text();
            if !text.is_empty() {
                value.push_str(&text);
            } else if self.eat(self.delimiter) {
                value.push(self.delimiter);
            } else if self.eat('\n') {
                value.push('\n');
            } else if self.rest().starts_with("\"\"") {
                self.pos += 2;
                value.push('"');
            } else {
                break;
            }
        }

        self.eat('"').then_some(value)
    }

    /// Consumes text up to the next line break, quote or delimiter.
    fn scan_text(&mut self) -> String {
        let delimiter = self.delimiter;
        let rest = self.rest();
        let len = rest
            .find(|c: char| c == '\n' || c == '"' || c == delimiter)
            .unwrap_or(rest.len());
        let text = rest[..len].to_string();
        self.pos += len;
        text
    }

    /// Skips blanks before a field, never the active delimiter.
    fn skip_blanks(&mut self) {
        let delimiter = self.delimiter;
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_whitespace() || c == '\n' || c == delimiter)
            .unwrap_or(rest.len());
        self.pos += len;
    }

    /// Consumes one line holding only blanks or only `,`/`;` characters.
    fn skip_empty_line(&mut self) -> bool {
        let start = self.pos;
        let rest = self.rest();
        let mut len = rest
            .find(|c: char| !c.is_whitespace() || c == '\n')
            .unwrap_or(rest.len());
        if len == 0 {
            len = rest.find(|c: char| c != ',' && c != ';').unwrap_or(rest.len());
        }
        self.pos += len;

        if self.eat('\n') {
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn skip_line(&mut self) {
        let rest = self.rest();
        let len = rest.find('\n').unwrap_or(rest.len());
        self.pos += len;
        self.eat('\n');
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
}

impl Iterator for TableParser {
    type Item = Table;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_table()
    }
}
