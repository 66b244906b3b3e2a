//! Tabular export
//!
//! A [`Dataset`] is a header list plus rows of [`Cell`]s. It encodes to the
//! delimited, structured and markup formats listed in [`Format`].

use itertools::Itertools;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{SupplyError, SupplyResult};
use crate::types::Cell;

/// Output format, named by its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    Tsv,
    Json,
    Yaml,
    Html,
    Latex,
    Markdown,
}

impl Format {
    pub const ALL: [Format; 7] = [
        Format::Csv,
        Format::Tsv,
        Format::Json,
        Format::Yaml,
        Format::Html,
        Format::Latex,
        Format::Markdown,
    ];

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Tsv => "tsv",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Html => "html",
            Format::Latex => "latex",
            Format::Markdown => "md",
        }
    }

    /// Every extension name accepted for this format
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Format::Csv => &["csv"],
            Format::Tsv => &["tsv"],
            Format::Json => &["json"],
            Format::Yaml => &["yaml", "yml"],
            Format::Html => &["html", "htm"],
            Format::Latex => &["latex", "tex"],
            Format::Markdown => &["md", "markdown"],
        }
    }

    /// True when `name` already ends with one of this format's extensions
    pub fn has_extension(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_lowercase();
                self.aliases().contains(&ext.as_str())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = SupplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('.').to_lowercase();
        if let Some(format) = Format::ALL
            .into_iter()
            .find(|f| f.aliases().contains(&name.as_str()))
        {
            return Ok(format);
        }

        match name.as_str() {
            "xls" | "xlsx" | "ods" | "dbf" => Err(SupplyError::UnsupportedFormat(format!(
                "'{}' spreadsheet output is not available; use csv or tsv",
                s
            ))),
            other => Err(SupplyError::UnsupportedFormat(other.to_string())),
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Encode the whole dataset in `format`
    pub fn export(&self, format: Format) -> SupplyResult<Vec<u8>> {
        match format {
            Format::Csv => self.delimited(b',', format),
            Format::Tsv => self.delimited(b'\t', format),
            Format::Json => serde_json::to_vec(&Records(self)).map_err(|e| encode_error(format, e)),
            Format::Yaml => serde_yml::to_string(&Records(self))
                .map(String::into_bytes)
                .map_err(|e| encode_error(format, e)),
            Format::Html => Ok(self.html().into_bytes()),
            Format::Latex => Ok(self.latex().into_bytes()),
            Format::Markdown => Ok(self.markdown().into_bytes()),
        }
    }

    /// Encode as a UTF-8 string
    pub fn export_string(&self, format: Format) -> SupplyResult<String> {
        let bytes = self.export(format)?;
        String::from_utf8(bytes).map_err(|e| encode_error(format, e))
    }

    fn delimited(&self, delimiter: u8, format: Format) -> SupplyResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer
            .write_record(&self.headers)
            .map_err(|e| encode_error(format, e))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|c| c.to_string()))
                .map_err(|e| encode_error(format, e))?;
        }

        writer
            .into_inner()
            .map_err(|e| encode_error(format, e.error()))
    }

    fn html(&self) -> String {
        let mut out = String::from("<table>\n<thead>\n<tr>");
        for header in &self.headers {
            out.push_str(&format!("<th>{}</th>", escape_html(header)));
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &self.rows {
            out.push_str("<tr>");
            for cell in row {
                out.push_str(&format!("<td>{}</td>", escape_html(&cell.to_string())));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
        out
    }

    fn latex(&self) -> String {
        let columns = "l".repeat(self.headers.len().max(1));
        let line = |cells: Vec<String>| format!("{} \\\\\n", cells.join(" & "));

        let mut out = format!("\\begin{{tabular}}{{{}}}\n\\hline\n", columns);
        out.push_str(&line(self.headers.iter().map(|h| escape_latex(h)).collect()));
        out.push_str("\\hline\n");
        for row in &self.rows {
            out.push_str(&line(row.iter().map(|c| escape_latex(&c.to_string())).collect()));
        }
        out.push_str("\\hline\n\\end{tabular}\n");
        out
    }

    fn markdown(&self) -> String {
        let row_line = |cells: Vec<String>| format!("| {} |\n", cells.join(" | "));

        let mut out = row_line(self.headers.iter().map(|h| escape_markdown(h)).collect());
        out.push_str(&format!(
            "|{}|\n",
            self.headers.iter().map(|_| " --- ").join("|")
        ));
        for row in &self.rows {
            out.push_str(&row_line(
                row.iter().map(|c| escape_markdown(&c.to_string())).collect(),
            ));
        }
        out
    }
}

fn encode_error(format: Format, err: impl fmt::Display) -> SupplyError {
    SupplyError::Encode {
        format: format.to_string(),
        message: err.to_string(),
    }
}

// =============================================================================
// Serde views: a sequence of header-ordered maps
// =============================================================================

struct Records<'a>(&'a Dataset);

struct Record<'a> {
    headers: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&Record {
                headers: &self.0.headers,
                cells: row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.cells) {
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}

// =============================================================================
// Escaping
// =============================================================================

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|")
}
