use tracing::debug;

use super::color::{ColorClassifier, Role};
use super::markdown::{self, Emphasis};
use crate::docs::types::{Document, TextRun, Topic};

pub const DEFAULT_HEADING_STYLE: &str = "HEADING_3";

/// Splits a document into topics using the background color of each run.
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    classifier: ColorClassifier,
    heading_style: String,
}

/// Topic still accepting runs.
struct OpenTopic {
    topic: String,
    description: Vec<String>,
    answer: Vec<String>,
}

impl OpenTopic {
    fn new(header: &str) -> Self {
        Self {
            topic: header.to_string(),
            description: Vec::new(),
            answer: Vec::new(),
        }
    }

    fn finish(self) -> Topic {
        Topic {
            topic: self.topic,
            description: self.description.join(" ").trim().to_string(),
            answer: self.answer.join(" ").trim().to_string(),
        }
    }
}

impl SectionExtractor {
    pub fn new(classifier: ColorClassifier, heading_style: impl Into<String>) -> Self {
        Self {
            classifier,
            heading_style: heading_style.into(),
        }
    }

    /// Topics in document order. Headers are not deduplicated; a document
    /// without any topic-colored heading yields an empty list.
    pub fn extract(&self, document: &Document) -> Vec<Topic> {
        let mut topics = Vec::new();
        let mut open: Option<OpenTopic> = None;

        for paragraph in &document.paragraphs {
            if paragraph.named_style == self.heading_style {
                let mut started = false;
                for run in &paragraph.runs {
                    let header = run.content.trim();
                    if header.is_empty() || self.role_of(run) != Some(Role::Topic) {
                        continue;
                    }
                    if let Some(previous) = open.take() {
                        topics.push(previous.finish());
                    }
                    open = Some(OpenTopic::new(header));
                    started = true;
                }
                if started {
                    continue;
                }
            }

            // Content before the first topic has nowhere to go.
            let Some(current) = open.as_mut() else {
                continue;
            };
            for run in &paragraph.runs {
                let target = match self.role_of(run) {
                    Some(Role::Description) => &mut current.description,
                    Some(Role::Answer) => &mut current.answer,
                    _ => continue,
                };
                let content = run.content.trim();
                if content.is_empty() {
                    continue;
                }
                let emphasis = Emphasis::from(&run.style);
                target.push(markdown::format(&markdown::escape(content), emphasis));
            }
        }

        if let Some(last) = open {
            topics.push(last.finish());
        }
        debug!(topics = topics.len(), "sections extracted");
        topics
    }

    fn role_of(&self, run: &TextRun) -> Option<Role> {
        self.classifier.classify(run.style.background)
    }
}
