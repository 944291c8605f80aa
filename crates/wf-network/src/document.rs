//! Lossless line model of a section-delimited network description.
//!
//! Every line is stored with its terminator, so an untouched document
//! re-serialises byte-for-byte. Edits replace a single whitespace-delimited
//! field and leave the rest of the line, including any comment, alone.

use std::ops::Range;

/// Start of an inline comment.
pub const COMMENT_CHAR: char = ';';

/// A bracketed section and the lines it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Upper-cased name without brackets.
    pub name: String,
    /// Line index of the `[NAME]` header.
    pub header: usize,
    /// Line indices of the body (up to the next header or end of file).
    pub body: Range<usize>,
}

/// One whitespace-delimited field of a data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    pub text: &'a str,
    /// Byte range within the line.
    pub span: Range<usize>,
}

/// A non-blank, non-comment line of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    /// Line index within the document.
    pub line: usize,
    pub fields: Vec<Field<'a>>,
}

impl<'a> Record<'a> {
    pub fn field(&self, i: usize) -> Option<&'a str> {
        self.fields.get(i).map(|f| f.text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InpDocument {
    lines: Vec<String>,
}

impl InpDocument {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        self.lines.concat()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line content without its terminator.
    pub fn content(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|l| strip_terminator(l))
    }

    /// All sections in file order.
    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        for (i, raw) in self.lines.iter().enumerate() {
            if let Some(name) = header_name(strip_terminator(raw)) {
                if let Some(prev) = sections.last_mut() {
                    prev.body.end = i;
                }
                sections.push(Section {
                    name,
                    header: i,
                    body: i + 1..self.lines.len(),
                });
            }
        }
        sections
    }

    /// Data records of every section called `name` (case-insensitive), in file order.
    pub fn records(&self, name: &str) -> Vec<Record<'_>> {
        let wanted = name.to_ascii_uppercase();
        self.sections()
            .into_iter()
            .filter(|s| s.name == wanted)
            .flat_map(|s| s.body)
            .filter_map(|line| self.record(line))
            .collect()
    }

    /// Tokenise one line; `None` for blank and comment-only lines.
    pub fn record(&self, line: usize) -> Option<Record<'_>> {
        let content = self.content(line)?;
        let fields = split_fields(content);
        if fields.is_empty() {
            return None;
        }
        Some(Record { line, fields })
    }

    /// Replace field `index` of `line` with `value`.
    ///
    /// When `index` equals the field count the value is appended after the
    /// last field, ahead of any comment. Returns `false` if the line or field
    /// does not exist.
    pub fn set_field(&mut self, line: usize, index: usize, value: &str) -> bool {
        let Some(raw) = self.lines.get(line) else {
            return false;
        };
        let content = strip_terminator(raw);
        let fields = split_fields(content);

        let (range, replacement) = if let Some(field) = fields.get(index) {
            (field.span.clone(), value.to_string())
        } else if index == fields.len() && !fields.is_empty() {
            let end = fields[fields.len() - 1].span.end;
            (end..end, format!("    {value}"))
        } else {
            return false;
        };

        if let Some(raw) = self.lines.get_mut(line) {
            raw.replace_range(range, &replacement);
        }
        true
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn header_name(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_ascii_uppercase())
}

/// Whitespace-separated fields of the part of `content` before the comment.
fn split_fields(content: &str) -> Vec<Field<'_>> {
    let data = match content.find(COMMENT_CHAR) {
        Some(pos) => &content[..pos],
        None => content,
    };

    let mut fields = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in data.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                fields.push(Field {
                    text: &data[s..i],
                    span: s..i,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        fields.push(Field {
            text: &data[s..],
            span: s..data.len(),
        });
    }
    fields
}
