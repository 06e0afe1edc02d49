//! Dataset annotation over JSONL files.
//!
//! Each line is one program record (a flattened object carrying `image_code`,
//! or a bare string of code). Requested columns are computed and written back
//! into the record, leaving every other field as it was.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::harness::Harness;
use super::HarnessError;
use crate::analysis;
use crate::db::{program_hash, DbError, OutcomeDb, OutcomeRecord};
use crate::model::{InputError, ProgramInput};
use crate::parser::ParserError;

/// Annotation columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Function record offsets over `image_code`.
    Functions,
    /// Execution outcome token.
    Test,
}

impl Column {
    pub const ALL: [Column; 2] = [Column::Functions, Column::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Functions => "functions",
            Column::Test => "test",
        }
    }

    /// Parse a comma-separated column list; `all` expands to every column.
    pub fn parse_list(list: &str) -> Result<Vec<Column>, AnnotateError> {
        let mut columns = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let expanded: Vec<Column> =
                if name == "all" { Column::ALL.to_vec() } else { vec![name.parse()?] };
            for column in expanded {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        Ok(columns)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = AnnotateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "functions" => Ok(Column::Functions),
            "test" => Ok(Column::Test),
            other => Err(AnnotateError::UnknownColumn(other.to_string())),
        }
    }
}

/// How a directory of JSONL files is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Annotate every file of the input directory into the output directory.
    Redo,
    /// Rewrite the files of the output directory in place.
    Update,
}

impl FromStr for Mode {
    type Err = AnnotateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redo" => Ok(Mode::Redo),
            "update" => Ok(Mode::Update),
            other => Err(AnnotateError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Unknown column '{0}' (expected functions, test or all)")]
    UnknownColumn(String),
    #[error("Unknown mode '{0}' (expected redo or update)")]
    UnknownMode(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON at {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid record at {path}:{line}: {source}")]
    Record {
        path: PathBuf,
        line: usize,
        #[source]
        source: InputError,
    },
    #[error("Failed to encode annotation: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Counters for one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotateSummary {
    pub files: usize,
    pub records: usize,
    /// Records that received a `functions` column.
    pub functions: usize,
    /// Records evaluated through the harness.
    pub tested: usize,
    /// Records whose `test` column came from the ledger.
    pub reused: usize,
    /// Records without usable `image_code`.
    pub skipped: usize,
}

impl AnnotateSummary {
    fn merge(&mut self, other: AnnotateSummary) {
        self.files += other.files;
        self.records += other.records;
        self.functions += other.functions;
        self.tested += other.tested;
        self.reused += other.reused;
        self.skipped += other.skipped;
    }
}

pub struct Annotator<'a> {
    harness: &'a Harness,
    ledger: Option<&'a OutcomeDb>,
    jobs: usize,
}

impl<'a> Annotator<'a> {
    pub fn new(harness: &'a Harness) -> Self {
        Self { harness, ledger: None, jobs: 1 }
    }

    pub fn with_ledger(mut self, ledger: Option<&'a OutcomeDb>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Compute `columns` for every record in place.
    pub fn annotate_records(
        &self,
        records: &mut [Map<String, Value>],
        columns: &[Column],
    ) -> Result<AnnotateSummary, AnnotateError> {
        let mut summary = AnnotateSummary { records: records.len(), ..Default::default() };

        let mut programs = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match ProgramInput::from_record(record) {
                Ok(program) => programs.push((index, program)),
                Err(err) => {
                    warn!(record = index, error = %err, "skipping record");
                    summary.skipped += 1;
                }
            }
        }

        if columns.contains(&Column::Functions) {
            for (index, program) in &programs {
                let functions = analysis::function_records(program.image_code())?;
                records[*index].insert(Column::Functions.to_string(), serde_json::to_value(functions)?);
                summary.functions += 1;
            }
        }

        if columns.contains(&Column::Test) {
            let (tested, reused) = self.annotate_outcomes(records, &programs)?;
            summary.tested = tested;
            summary.reused = reused;
        }

        Ok(summary)
    }

    fn annotate_outcomes(
        &self,
        records: &mut [Map<String, Value>],
        programs: &[(usize, ProgramInput)],
    ) -> Result<(usize, usize), AnnotateError> {
        let renderer = self.harness.renderer_id();
        let mut reused = 0;
        let mut pending = Vec::new();
        let mut pending_meta = Vec::new();

        for (index, program) in programs {
            let hash = program_hash(program)?;
            let known = match self.ledger {
                Some(ledger) => ledger.lookup(&hash, &renderer)?,
                None => None,
            };
            match known {
                Some(row) => {
                    records[*index].insert(Column::Test.to_string(), row.outcome.as_str().into());
                    reused += 1;
                }
                None => {
                    pending.push(program.clone());
                    pending_meta.push((*index, hash));
                }
            }
        }

        let results = self.harness.evaluate_batch(&pending, self.jobs);
        for ((index, hash), result) in pending_meta.into_iter().zip(results) {
            let evaluation = result?;
            records[index].insert(Column::Test.to_string(), evaluation.outcome.as_str().into());
            if let Some(ledger) = self.ledger {
                let row = OutcomeRecord::new(hash, &renderer, evaluation.outcome, evaluation.elapsed_ms)
                    .with_detail(evaluation.detail());
                ledger.record(&row)?;
            }
        }

        Ok((pending.len(), reused))
    }

    /// Annotate one JSONL file into `output` (which may be the same path).
    pub fn annotate_file(
        &self,
        input: &Path,
        output: &Path,
        columns: &[Column],
    ) -> Result<AnnotateSummary, AnnotateError> {
        let mut records = read_jsonl(input)?;
        let mut summary = self.annotate_records(&mut records, columns)?;
        write_jsonl(output, &records)?;
        summary.files = 1;
        info!(input = %input.display(), output = %output.display(), records = summary.records, "annotated file");
        Ok(summary)
    }

    /// Annotate every `.jsonl` file according to `mode`.
    pub fn annotate_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        mode: Mode,
        columns: &[Column],
    ) -> Result<AnnotateSummary, AnnotateError> {
        let source_dir = match mode {
            Mode::Redo => input_dir,
            Mode::Update => output_dir,
        };
        fs::create_dir_all(output_dir)
            .map_err(|source| AnnotateError::Io { path: output_dir.to_path_buf(), source })?;

        let mut summary = AnnotateSummary::default();
        for path in list_dir(source_dir)? {
            let Some(name) = path.file_name() else { continue };
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                info!(file = %path.display(), "skipping non-jsonl file");
                continue;
            }
            summary.merge(self.annotate_file(&path, &output_dir.join(name), columns)?);
        }
        Ok(summary)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, AnnotateError> {
    let io_err = |source| AnnotateError::Io { path: dir.to_path_buf(), source };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read a JSONL file of program records. Blank lines are ignored; a line that
/// is a bare string becomes a record with that string as `image_code`.
pub fn read_jsonl(path: &Path) -> Result<Vec<Map<String, Value>>, AnnotateError> {
    let io_err = |source| AnnotateError::Io { path: path.to_path_buf(), source };
    let reader = BufReader::new(fs::File::open(path).map_err(io_err)?);

    let mut records = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = number + 1;
        let value: Value = serde_json::from_str(&line).map_err(|source| AnnotateError::Json {
            path: path.to_path_buf(),
            line: line_no,
            source,
        })?;
        let record = match value {
            Value::Object(map) => map,
            Value::String(code) => {
                let mut map = Map::new();
                map.insert("image_code".to_string(), Value::String(code));
                map
            }
            other => {
                let source = match ProgramInput::from_value(&other) {
                    Err(err) => err,
                    Ok(_) => InputError::MissingImageCode,
                };
                return Err(AnnotateError::Record { path: path.to_path_buf(), line: line_no, source });
            }
        };
        records.push(record);
    }
    Ok(records)
}

/// Write records as JSONL, replacing `path` only once the whole file is written.
pub fn write_jsonl(path: &Path, records: &[Map<String, Value>]) -> Result<(), AnnotateError> {
    let io_err = |source| AnnotateError::Io { path: path.to_path_buf(), source };
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;

    let mut writer = BufWriter::new(tmp.as_file());
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    drop(writer);

    tmp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
