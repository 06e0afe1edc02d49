use std::path::Path;

use anyhow::Result;
use curator_core::analysis;
use curator_core::parser;

use crate::read_program;

/// Print the function records of a program.
pub fn functions_command(path: &Path, json: bool, header: bool) -> Result<()> {
    let program = read_program(path)?;
    let source = program.image_code();
    let tree = parser::parse(source)?;
    let records = analysis::parse_functions(&tree);

    if json {
        let mut out = serde_json::json!({ "functions": records });
        if header {
            out["header_comment"] = match analysis::file_header_comment(&tree) {
                Some(span) => serde_json::json!([span.start, span.end]),
                None => serde_json::Value::Null,
            };
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if header {
        match analysis::file_header_comment(&tree) {
            Some(span) => println!("Header comment: {}..{}", span.start, span.end),
            None => println!("Header comment: none"),
        }
    }
    if records.is_empty() {
        println!("No functions found.");
        return Ok(());
    }
    for record in &records {
        let [a, b, c, d, e] = record.as_array();
        let signature = record
            .parts(source)
            .map(|parts| parts.header.trim_end_matches('{').split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        println!("{a:>6} {b:>6} {c:>6} {d:>6} {e:>6}  {signature}");
    }
    Ok(())
}
