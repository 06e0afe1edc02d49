//! Function boundary and comment-context association.
//!
//! Walks the top level of a parsed program and emits one `FunctionRecord` per
//! well-formed function definition:
//! - leading context is the run of line-adjacent whole-line comments ending on
//!   the line right before the function;
//! - docstring is the run of comments opening the function body.
//!
//! Context is never carried across functions, and anything other than a
//! whole-line comment (code, directives, trailing comments, error nodes) breaks
//! a leading run.

use std::ops::Range;

use tracing::debug;

use crate::model::FunctionRecord;
use crate::parser::{self, kind, last_line, Node, ParserError, SyntaxTree};

/// Comment run currently being tracked between functions.
#[derive(Debug, Default)]
struct CommentRun {
    start: Option<usize>,
    last_line: Option<usize>,
}

impl CommentRun {
    fn push(&mut self, comment: Node<'_>) {
        if self.last_line.map(|l| l + 1) != Some(comment.start_position().row) {
            self.start = Some(comment.start_byte());
        }
        self.last_line = Some(last_line(comment));
    }

    /// Run start, if the run ends on the line just before `line`.
    fn leading(&self, line: usize) -> Option<usize> {
        if self.last_line.map(|l| l + 1) == Some(line) {
            self.start
        } else {
            None
        }
    }
}

/// A comment is whole-line when nothing before it ends on its first line.
fn is_whole_line(comment: Node<'_>, previous: Option<Node<'_>>) -> bool {
    previous.map_or(true, |prev| last_line(prev) < comment.start_position().row)
}

/// Extract function records from a parsed tree, in source order.
pub fn parse_functions(tree: &SyntaxTree<'_>) -> Vec<FunctionRecord> {
    let mut records = Vec::new();
    let mut run = CommentRun::default();
    let mut previous = None;

    for node in tree.top_level() {
        match node.kind() {
            kind::COMMENT if is_whole_line(node, previous) => run.push(node),
            kind::FUNCTION_DEFINITION => {
                if node.has_error() {
                    debug!(start = node.start_byte(), "skipping malformed function definition");
                } else if let Some(record) = function_record(node, &run) {
                    records.push(record);
                }
                run = CommentRun::default();
            }
            _ => run = CommentRun::default(),
        }
        previous = Some(node);
    }

    records
}

/// Parse `source` and extract its function records.
pub fn function_records(source: &str) -> Result<Vec<FunctionRecord>, ParserError> {
    Ok(parse_functions(&parser::parse(source)?))
}

fn function_record(node: Node<'_>, run: &CommentRun) -> Option<FunctionRecord> {
    let start_header = node.start_byte();
    let body = node.child_by_field_name("body").filter(|b| b.kind() == kind::COMPOUND_STATEMENT)?;
    let mut cursor = body.walk();
    let mut children = body.children(&mut cursor);
    let end_header = children.next().filter(|open| open.kind() == "{")?.end_byte();
    let end_docstring = children
        .take_while(|c| c.kind() == kind::COMMENT)
        .last()
        .map_or(end_header, |c| c.end_byte());

    Some(FunctionRecord {
        start_comment: run.leading(node.start_position().row).unwrap_or(start_header),
        start_header,
        end_header,
        end_docstring,
        end_function: node.end_byte(),
    })
}

/// Byte span of the comments opening the file, before any code.
///
/// This is where programs usually carry their license or attribution text.
pub fn file_header_comment(tree: &SyntaxTree<'_>) -> Option<Range<usize>> {
    let top = tree.top_level();
    let mut comments = top.iter().take_while(|n| n.kind() == kind::COMMENT);
    let first = comments.next()?;
    let last = comments.last().unwrap_or(first);
    Some(first.start_byte()..last.end_byte())
}
