//! Parser for the plain-text question document.
//!
//! ```text
//! <question>
//! 2+2?
//! <variant>4
//! <variant>5
//! ```
//!
//! The first non-empty `<variant>` of every block is the correct answer.
//! Authors must list the right option first; nothing else marks correctness.

use thiserror::Error;

pub const QUESTION_MARKER: &str = "<question>";
pub const VARIANT_MARKER: &str = "<variant>";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportError {
    #[error("the document contains no <question> blocks")]
    EmptyDocument,

    #[error("none of the {blocks} question blocks has a non-empty <variant> answer")]
    NoValidQuestions { blocks: usize },
}

/// An answer option as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub text: String,
    pub is_correct: bool,
}

/// A question block that survived parsing.
///
/// Always holds at least one answer, and exactly one of them is correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub text: String,
    pub answers: Vec<ParsedAnswer>,
}

impl ParsedQuestion {
    #[must_use]
    pub fn correct_answer(&self) -> Option<&ParsedAnswer> {
        self.answers.iter().find(|a| a.is_correct)
    }
}

/// Result of parsing a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDocument {
    questions: Vec<ParsedQuestion>,
    dropped_blocks: usize,
}

impl ImportDocument {
    /// Parse a question document.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::EmptyDocument` when no block remains after trimming
    /// and `ImportError::NoValidQuestions` when every block was dropped.
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let blocks: Vec<&str> = text
            .split(QUESTION_MARKER)
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect();
        if blocks.is_empty() {
            return Err(ImportError::EmptyDocument);
        }

        let questions: Vec<ParsedQuestion> =
            blocks.iter().filter_map(|block| parse_block(block)).collect();
        if questions.is_empty() {
            return Err(ImportError::NoValidQuestions {
                blocks: blocks.len(),
            });
        }

        Ok(Self {
            dropped_blocks: blocks.len() - questions.len(),
            questions,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[ParsedQuestion] {
        &self.questions
    }

    /// Blocks skipped because they had no usable variant.
    #[must_use]
    pub fn dropped_blocks(&self) -> usize {
        self.dropped_blocks
    }
}

fn parse_block(block: &str) -> Option<ParsedQuestion> {
    let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
    let text = lines.next()?.to_owned();

    let mut answers: Vec<ParsedAnswer> = Vec::new();
    for line in lines {
        let Some(rest) = line.strip_prefix(VARIANT_MARKER) else {
            continue;
        };
        let answer = rest.trim();
        if answer.is_empty() {
            continue;
        }
        answers.push(ParsedAnswer {
            text: answer.to_owned(),
            is_correct: answers.is_empty(),
        });
    }

    if answers.is_empty() {
        return None;
    }
    Some(ParsedQuestion { text, answers })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str =
        "<question>\n2+2?\n<variant>4\n<variant>5\n<question>\n3+3?\n<variant>6\n<variant>5\n";

    #[test]
    fn parses_blocks_and_marks_first_variant_correct() {
        let doc = ImportDocument::parse(TWO_BLOCKS).unwrap();
        assert_eq!(doc.questions().len(), 2);
        assert_eq!(doc.dropped_blocks(), 0);

        let first = &doc.questions()[0];
        assert_eq!(first.text, "2+2?");
        assert_eq!(first.answers.len(), 2);
        assert_eq!(first.correct_answer().unwrap().text, "4");
        assert!(!first.answers[1].is_correct);

        let second = &doc.questions()[1];
        assert_eq!(second.correct_answer().unwrap().text, "6");
    }

    #[test]
    fn empty_variants_are_skipped_before_choosing_correct() {
        let doc = ImportDocument::parse("<question>Capital of France?\n<variant>   \n<variant> Paris \n<variant>Lyon").unwrap();
        let q = &doc.questions()[0];
        assert_eq!(q.answers.len(), 2);
        assert_eq!(q.answers[0].text, "Paris");
        assert!(q.answers[0].is_correct);
        assert_eq!(q.answers.iter().filter(|a| a.is_correct).count(), 1);
    }

    #[test]
    fn blocks_without_variants_are_dropped() {
        let doc =
            ImportDocument::parse("<question>\nNo options here\n<question>\nQ?\n<variant>A").unwrap();
        assert_eq!(doc.questions().len(), 1);
        assert_eq!(doc.dropped_blocks(), 1);
        assert_eq!(doc.questions()[0].text, "Q?");
    }

    #[test]
    fn lines_without_marker_are_ignored() {
        let doc = ImportDocument::parse(
            "<question>\r\nQ?\r\n\r\nsome note\r\n<variant>yes\r\n<variant>no\r\n",
        )
        .unwrap();
        let q = &doc.questions()[0];
        assert_eq!(q.text, "Q?");
        assert_eq!(q.answers.len(), 2);
    }

    #[test]
    fn blank_document_is_empty() {
        assert_eq!(
            ImportDocument::parse("  \n\n ").unwrap_err(),
            ImportError::EmptyDocument
        );
        assert_eq!(
            ImportDocument::parse("<question>\n<question>  \n").unwrap_err(),
            ImportError::EmptyDocument
        );
    }

    #[test]
    fn document_with_only_empty_blocks_has_no_valid_questions() {
        let err = ImportDocument::parse("<question>Q1\n<variant>\n<question>Q2\n").unwrap_err();
        assert_eq!(err, ImportError::NoValidQuestions { blocks: 2 });
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let doc = ImportDocument::parse("\u{feff}<question>Q\n<variant>A").unwrap();
        assert_eq!(doc.questions()[0].text, "Q");
    }
}
