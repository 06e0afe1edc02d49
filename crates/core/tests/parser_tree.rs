use std::time::Duration;

use curator_core::parser::{self, kind, last_line, ParserError};

fn kinds(source: &str) -> Vec<&'static str> {
    parser::parse(source).expect("parse").top_level().iter().map(|n| n.kind()).collect()
}

#[test]
fn parses_top_level_items_in_order() {
    let source = "\
// header
uniform float iTime;
float sdf(vec3 p);
void main() {
    gl_FragColor = vec4(1.0);
}
";
    assert_eq!(kinds(source), ["comment", "declaration", "declaration", "function_definition"]);
    assert!(!parser::parse(source).expect("parse").has_error());
}

#[test]
fn function_body_opens_with_brace_then_comments() {
    let source = "vec3 shade(in vec3 n) {\n    // docs\n    return n;\n}\n";
    let tree = parser::parse(source).expect("parse");
    let func = tree.top_level()[0];
    assert_eq!(func.kind(), kind::FUNCTION_DEFINITION);

    let body = func.child_by_field_name("body").expect("body");
    assert_eq!(body.kind(), kind::COMPOUND_STATEMENT);
    let mut cursor = body.walk();
    let body_kinds: Vec<&str> = body.children(&mut cursor).map(|n| n.kind()).collect();
    assert_eq!(body_kinds.first(), Some(&"{"));
    assert_eq!(body_kinds.get(1), Some(&kind::COMMENT));
    assert_eq!(body_kinds.last(), Some(&"}"));
    assert_eq!(func.end_byte(), source.trim_end().len());
    assert_eq!(tree.text(func).lines().next(), Some("vec3 shade(in vec3 n) {"));
}

#[test]
fn missing_closing_brace_is_an_error() {
    let tree = parser::parse("void main() {\n    float x = 1.0;\n").expect("parse");
    assert!(tree.has_error());
    let error = tree.first_error().expect("error node");
    assert!(error.is_error() || error.is_missing());
}

#[test]
fn stray_closing_brace_is_reported() {
    let tree = parser::parse("void main() { }\n}\n").expect("parse");
    assert!(tree.has_error());
    let error = tree.first_error().expect("error node");
    assert_eq!(error.start_position().row, 1);
    assert!(error.kind() == kind::ERROR || error.is_missing());
}

#[test]
fn preprocessor_lines_end_on_their_own_line() {
    let source = "#define MIX(a, b) \\\n    mix(a, b, 0.5)\nvoid main() {}\n";
    let tree = parser::parse(source).expect("parse");
    let define = tree.top_level()[0];
    assert!(define.kind().starts_with("preproc"), "{}", define.kind());
    assert_eq!((define.start_position().row, last_line(define)), (0, 1));
    assert_eq!(tree.top_level()[1].kind(), kind::FUNCTION_DEFINITION);
}

#[test]
fn deep_nesting_parses_and_reports_without_recursion() {
    let depth = 100_000;
    let balanced = format!("void f() {{{}{}}}\n", "{".repeat(depth), "}".repeat(depth));
    let tree = parser::parse(&balanced).expect("parse");
    assert!(tree.first_error().is_none());
    assert_eq!(tree.top_level()[0].kind(), kind::FUNCTION_DEFINITION);

    let stray = format!("{}}}\n", balanced);
    let tree = parser::parse(&stray).expect("parse");
    assert!(tree.first_error().is_some());
}

#[test]
fn parse_within_gives_up_after_the_deadline() {
    let source = format!("void f() {{{}{}}}\n", "{".repeat(50_000), "}".repeat(50_000));
    match parser::parse_within(&source, Duration::ZERO) {
        Err(ParserError::TimedOut(deadline)) => assert_eq!(deadline, Duration::ZERO),
        other => panic!("expected timeout, got {other:?}"),
    }
    let tree = parser::parse_within(&source, Duration::from_secs(30)).expect("parse");
    assert!(!tree.has_error());
}

#[test]
fn never_panics_on_hostile_input() {
    let inputs = [
        "",
        "}}}}",
        "((((",
        "/* never closed",
        "void f() { /* open",
        "#",
        "\\\n\\",
        "vec2 ü = vec2(1.0); // ünïcödé\nvoid f() { return; }",
        "void f() { { { } }",
        ";;;",
        "1.0e-5 .5 0x1F",
    ];
    for input in inputs {
        let tree = parser::parse(input).expect("parse");
        for node in tree.top_level() {
            assert!(node.start_byte() <= node.end_byte() && node.end_byte() <= input.len(), "{input:?}");
            assert!(input.is_char_boundary(node.start_byte()) && input.is_char_boundary(node.end_byte()));
        }
    }
}
