//! Isolates the text inserted between two revisions.
//!
//! The alignment is a shortest edit script (Myers), i.e. a longest common
//! subsequence of the chosen unit. Only inserted units are kept. Deleted and
//! unchanged units are dropped and terminate the block being collected.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// Unit of comparison.
///
/// `Line` reports a partially edited line as added in full. `Char` reports
/// only the novel characters. Pick whichever precision the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Line,
    Char,
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "lines" => Ok(Granularity::Line),
            "char" | "chars" | "character" => Ok(Granularity::Char),
            other => bail!("unknown diff granularity '{}' (expected line or char)", other),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Line => f.write_str("line"),
            Granularity::Char => f.write_str("char"),
        }
    }
}

/// One maximal run of inserted units, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedBlock {
    pub text: String,
    /// Number of inserted units merged into this block.
    pub units: usize,
}

/// Blocks of text present in `new` but not aligned with anything in `old`,
/// in the order they appear in `new`. Blocks that are only whitespace are
/// dropped.
pub fn diff_added(old: &str, new: &str, granularity: Granularity) -> Vec<AddedBlock> {
    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    let (old, new) = match granularity {
        Granularity::Line => (terminated(old), terminated(new)),
        Granularity::Char => (Cow::Borrowed(old), Cow::Borrowed(new)),
    };
    let diff = match granularity {
        Granularity::Line => config.diff_lines(old.as_ref(), new.as_ref()),
        Granularity::Char => config.diff_chars(old.as_ref(), new.as_ref()),
    };

    let mut blocks = Vec::new();
    let mut pending = String::new();
    let mut units = 0;
    for change in diff.iter_all_changes() {
        if change.tag() == ChangeTag::Insert {
            pending.push_str(change.value());
            units += 1;
        } else {
            flush(&mut blocks, &mut pending, &mut units);
        }
    }
    flush(&mut blocks, &mut pending, &mut units);
    blocks
}

/// Lines compare with their terminators, so an unterminated last line would
/// never equal the same line once more text follows it.
fn terminated(text: &str) -> Cow<'_, str> {
    if text.is_empty() || text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\n", text))
    }
}

fn flush(blocks: &mut Vec<AddedBlock>, pending: &mut String, units: &mut usize) {
    if *units == 0 {
        return;
    }
    let text = pending.trim();
    if !text.is_empty() {
        blocks.push(AddedBlock {
            text: text.to_string(),
            units: *units,
        });
    }
    pending.clear();
    *units = 0;
}

/// Just the texts of `diff_added`.
pub fn added_texts(old: &str, new: &str, granularity: Granularity) -> Vec<String> {
    diff_added(old, new, granularity)
        .into_iter()
        .map(|b| b.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_change_yields_nothing() {
        for text in ["", "line1\n", "a\nb\nc", "hello world"] {
            assert!(diff_added(text, text, Granularity::Line).is_empty());
            assert!(diff_added(text, text, Granularity::Char).is_empty());
        }
    }

    #[test]
    fn test_appended_line() {
        let blocks = diff_added("line1\n", "line1\nline2\n", Granularity::Line);
        assert_eq!(
            blocks,
            vec![AddedBlock {
                text: "line2".to_string(),
                units: 1,
            }]
        );
    }

    #[test]
    fn test_unterminated_last_line_still_matches() {
        assert_eq!(added_texts("line1", "line1\nline2", Granularity::Line), vec!["line2"]);
        assert_eq!(added_texts("line1", "line1\nline2\n", Granularity::Line), vec!["line2"]);
        assert!(diff_added("line1\n", "line1", Granularity::Line).is_empty());
    }

    #[test]
    fn test_appended_suffix_chars() {
        let blocks = added_texts("First idea.", "First idea. Second idea!", Granularity::Char);
        assert_eq!(blocks, vec!["Second idea!"]);
    }

    #[test]
    fn test_contiguous_lines_merge() {
        let old = "a\nz\n";
        let new = "a\nb\nc\nz\nd\n";
        assert_eq!(added_texts(old, new, Granularity::Line), vec!["b\nc", "d"]);
    }

    #[test]
    fn test_char_insertions_split_by_unchanged() {
        let old = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxESTOES";
        let new = "yESTOESUNA PRUEBA";
        assert_eq!(added_texts(old, new, Granularity::Char), vec!["y", "UNA PRUEBA"]);
    }

    #[test]
    fn test_deletions_are_not_reported() {
        assert!(diff_added("keep\ndrop\n", "keep\n", Granularity::Line).is_empty());
        assert!(diff_added("abcdef", "abf", Granularity::Char).is_empty());
    }

    #[test]
    fn test_partial_line_edit_granularity() {
        let old = "the plan is good\n";
        let new = "the plan is very good\n";
        assert_eq!(
            added_texts(old, new, Granularity::Line),
            vec!["the plan is very good"]
        );
        assert_eq!(added_texts(old, new, Granularity::Char), vec!["very"]);
    }

    #[test]
    fn test_whitespace_only_insertion_dropped() {
        assert!(diff_added("a b", "a  b", Granularity::Char).is_empty());
    }

    #[test]
    fn test_blocks_come_from_new_text() {
        let pairs = [
            ("alpha\nbeta\n", "beta\nalpha\ngamma\n"),
            ("one two three", "three two one four"),
            ("", "fresh content\n"),
            ("shared\n", "new\nshared\nnewer\n"),
        ];
        for (old, new) in pairs {
            for granularity in [Granularity::Line, Granularity::Char] {
                for block in diff_added(old, new, granularity) {
                    assert!(new.contains(&block.text), "{:?} not in {:?}", block.text, new);
                    assert!(block.units > 0);
                }
            }
        }
    }

    #[test]
    fn test_moved_line_not_reported_twice() {
        // "beta" is matched by the alignment, so only one of the two
        // moved lines can be counted as inserted.
        let blocks = added_texts("alpha\nbeta\n", "beta\nalpha\n", Granularity::Line);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("LINE".parse::<Granularity>().unwrap(), Granularity::Line);
        assert_eq!("char".parse::<Granularity>().unwrap(), Granularity::Char);
        assert!("word".parse::<Granularity>().is_err());
    }
}
