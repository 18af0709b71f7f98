//! Minimal section-keyed text documents.
//!
//! ```text
//! [section]
//! key=value
//! ```
//!
//! Sections and entries keep their order. Blank lines and lines starting
//! with `#` or `;` are ignored when parsing.

use crate::errors::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.push((key.into(), value.to_string()));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value under `key`, which must exist.
    pub fn require(&self, key: &str) -> Result<&str, ParseError> {
        self.get(key).ok_or_else(|| ParseError::MissingKey {
            section: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Value under `key` parsed as an unsigned integer.
    pub fn require_u32(&self, key: &str) -> Result<u32, ParseError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| ParseError::InvalidNumber {
            section: self.name.clone(),
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Render with a blank line between sections.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in section.entries() {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut doc = Document::new();
        let mut current: Option<Section> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ParseError::Syntax {
                    line: line_no,
                    message: format!("unterminated section header '{}'", line),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ParseError::Syntax {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                if let Some(done) = current.take() {
                    doc.push(done);
                }
                if doc.section(name).is_some() {
                    return Err(ParseError::DuplicateSection {
                        section: name.to_string(),
                        line: line_no,
                    });
                }
                current = Some(Section::new(name));
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ParseError::Syntax {
                line: line_no,
                message: format!("expected key=value, found '{}'", line),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ParseError::Syntax {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }
            let section = current.as_mut().ok_or_else(|| ParseError::Syntax {
                line: line_no,
                message: format!("'{}' appears before any section header", key),
            })?;
            section.push(key, value.trim());
        }

        if let Some(done) = current.take() {
            doc.push(done);
        }
        Ok(doc)
    }
}
