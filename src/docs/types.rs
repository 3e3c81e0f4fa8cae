use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Background color of a run, channels in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// None when the run has no background highlight.
    pub background: Option<Rgb>,
}

/// A styled run of text, immutable once read from the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Named style, e.g. "NORMAL_TEXT" or "HEADING_3".
    pub named_style: String,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Whole-document plain text: every run's content in document order.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .flat_map(|p| p.runs.iter())
            .map(|r| r.content.as_str())
            .collect()
    }
}

/// Metadata of one stored revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionMeta {
    pub id: String,
    pub author: String,
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub export_links: BTreeMap<String, String>,
    #[serde(default)]
    pub published: bool,
}

/// A labeled section: header plus accumulated description and answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    pub description: String,
    pub answer: String,
}
