//! GLSL source parser.
//!
//! Thin layer over the tree-sitter GLSL grammar. Malformed regions become
//! `ERROR` or missing nodes and set `has_error` on every ancestor; parsing
//! never rejects input and has no side effects.
//!
//! Walks over the tree use a cursor or a loop over children, never recursion,
//! so arbitrarily deep nesting in untrusted programs cannot exhaust the stack.

use std::time::{Duration, Instant};

use thiserror::Error;
use tree_sitter::{Language, ParseOptions, ParseState, Parser, Point, Tree};

pub use tree_sitter::Node;

/// Node kinds of the GLSL grammar that the analysis relies on.
pub mod kind {
    pub const COMMENT: &str = "comment";
    pub const FUNCTION_DEFINITION: &str = "function_definition";
    pub const COMPOUND_STATEMENT: &str = "compound_statement";
    /// Region error recovery could not fit into the grammar.
    pub const ERROR: &str = "ERROR";
}

/// Failure to produce a tree at all; malformed input never causes one.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Failed to load the GLSL grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("Parse did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("Parser produced no tree")]
    NoTree,
}

/// The tree-sitter GLSL language.
pub fn language() -> Language {
    tree_sitter_glsl::LANGUAGE_GLSL.into()
}

fn new_parser() -> Result<Parser, ParserError> {
    let mut parser = Parser::new();
    parser.set_language(&language())?;
    Ok(parser)
}

/// Parse `source` into a syntax tree borrowing it.
pub fn parse(source: &str) -> Result<SyntaxTree<'_>, ParserError> {
    let tree = new_parser()?.parse(source, None).ok_or(ParserError::NoTree)?;
    Ok(SyntaxTree { source, tree })
}

/// Like [`parse`], but gives up once `deadline` has elapsed.
pub fn parse_within(source: &str, deadline: Duration) -> Result<SyntaxTree<'_>, ParserError> {
    let mut parser = new_parser()?;
    let start = Instant::now();
    let bytes = source.as_bytes();

    let mut read = |offset: usize, _: Point| bytes.get(offset..).unwrap_or_default();
    let mut expired = |_: &ParseState| start.elapsed() >= deadline;
    let options = ParseOptions::new().progress_callback(&mut expired);

    match parser.parse_with_options(&mut read, None, Some(options)) {
        Some(tree) => Ok(SyntaxTree { source, tree }),
        None if start.elapsed() >= deadline => Err(ParserError::TimedOut(deadline)),
        None => Err(ParserError::NoTree),
    }
}

/// Read-only view over a parsed source buffer.
pub struct SyntaxTree<'s> {
    source: &'s str,
    tree: Tree,
}

impl<'s> SyntaxTree<'s> {
    /// The buffer this tree was parsed from.
    pub fn source(&self) -> &'s str {
        self.source
    }

    /// The `translation_unit` node.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Top-level nodes in source order.
    pub fn top_level(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        root.children(&mut cursor).collect()
    }

    /// Whether any node is an `ERROR` or missing node.
    pub fn has_error(&self) -> bool {
        self.root().has_error()
    }

    /// First `ERROR` or missing node, for diagnostics.
    ///
    /// Descends one level per step into the first child still carrying an
    /// error; a flagged node without such a child is returned itself.
    pub fn first_error(&self) -> Option<Node<'_>> {
        let mut node = self.root();
        if !node.has_error() {
            return None;
        }
        let mut cursor = node.walk();
        loop {
            if node.is_error() || node.is_missing() {
                return Some(node);
            }
            let next = node.children(&mut cursor).find(|child| child.has_error());
            match next {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }
}

impl std::fmt::Debug for SyntaxTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("len", &self.source.len())
            .field("has_error", &self.has_error())
            .finish()
    }
}

/// Zero-based line on which `node` ends.
///
/// Nodes that swallow their trailing newline (preprocessor lines) end at
/// column 0 of the next line; that line is not counted as theirs.
pub fn last_line(node: Node<'_>) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}
