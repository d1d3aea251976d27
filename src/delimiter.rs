use std::fmt;

/// Column separator chosen in the wizard.
///
/// `Whitespace` is distinct from a literal single space: it splits on any
/// run of spaces and tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Whitespace,
    Semicolon,
    Pipe,
    DoubleQuote,
    SingleQuote,
    Other(String),
}

/// Name → symbol table, in the order the wizard lists them.
pub const DELIMITERS: &[(&str, &str)] = &[
    ("Tab", "\t"),
    ("Comma", ","),
    ("Whitespace", " "),
    ("Semicolon", ";"),
    ("Pipe", "|"),
    ("Double Quote", "\""),
    ("Single Quote", "'"),
];

impl Delimiter {
    /// Look up a delimiter by its display name, falling back to treating the
    /// input as the symbol itself.
    pub fn from_name(name: &str) -> Self {
        DELIMITERS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, symbol)| Delimiter::from_symbol(symbol))
            .unwrap_or_else(|| Delimiter::from_symbol(name))
    }

    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "\t" => Delimiter::Tab,
            "," => Delimiter::Comma,
            " " => Delimiter::Whitespace,
            ";" => Delimiter::Semicolon,
            "|" => Delimiter::Pipe,
            "\"" => Delimiter::DoubleQuote,
            "'" => Delimiter::SingleQuote,
            other => Delimiter::Other(other.to_string()),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Delimiter::Tab => "\t",
            Delimiter::Comma => ",",
            Delimiter::Whitespace => " ",
            Delimiter::Semicolon => ";",
            Delimiter::Pipe => "|",
            Delimiter::DoubleQuote => "\"",
            Delimiter::SingleQuote => "'",
            Delimiter::Other(s) => s,
        }
    }

    /// Single byte the `csv` reader can split on, if there is one.
    pub(crate) fn csv_byte(&self) -> Option<u8> {
        match self {
            Delimiter::Whitespace => None,
            other => match other.symbol().as_bytes() {
                [b] => Some(*b),
                _ => None,
            },
        }
    }

    /// Quote characters used as separators cannot also quote fields.
    pub(crate) fn is_quote(&self) -> bool {
        matches!(self.symbol(), "\"" | "'")
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DELIMITERS.iter().find(|(_, s)| *s == self.symbol()) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "'{}'", self.symbol()),
        }
    }
}
