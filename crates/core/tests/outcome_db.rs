use curator_core::db::{program_hash, sha256_hex, DbError, OutcomeDb, OutcomeRecord};
use curator_core::model::{Outcome, ProgramInput};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn record_and_lookup_round_trip() {
    let db = OutcomeDb::open_in_memory().expect("open");
    let record = OutcomeRecord::new("abc", "shadertoy-render 800x450@0", Outcome::Crash, 42)
        .with_detail(Some("terminated by signal 11".to_string()));
    assert!(db.record(&record).expect("insert"));

    let found = db.lookup("abc", "shadertoy-render 800x450@0").expect("lookup").expect("row");
    assert_eq!(found, record);
    assert!(db.lookup("abc", "other-renderer").expect("lookup").is_none());
}

#[test]
fn recorded_outcomes_are_immutable() {
    let db = OutcomeDb::open_in_memory().expect("open");
    assert!(db.record(&OutcomeRecord::new("h", "r", Outcome::Timeout, 5000)).expect("first"));
    assert!(!db.record(&OutcomeRecord::new("h", "r", Outcome::Ok, 10)).expect("second"));

    let row = db.lookup("h", "r").expect("lookup").expect("row");
    assert_eq!(row.outcome, Outcome::Timeout);
    assert_eq!(row.elapsed_ms, 5000);
}

#[test]
fn list_filters_and_counts() {
    let db = OutcomeDb::open_in_memory().expect("open");
    for (hash, outcome) in [("a", Outcome::Ok), ("b", Outcome::Error), ("c", Outcome::Ok)] {
        db.record(&OutcomeRecord::new(hash, "r", outcome, 1)).expect("insert");
    }

    let all = db.list(None).expect("list");
    let hashes: Vec<&str> = all.iter().map(|r| r.source_hash.as_str()).collect();
    assert_eq!(hashes, ["a", "b", "c"]);

    let ok = db.list(Some(Outcome::Ok)).expect("list ok");
    assert_eq!(ok.len(), 2);

    let counts = db.counts().expect("counts");
    assert_eq!(counts.get("ok"), Some(&2));
    assert_eq!(counts.get("error"), Some(&1));
    assert_eq!(counts.get("panic"), None);
}

#[test]
fn ledger_persists_across_reopen() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("outcomes.db");
    {
        let db = OutcomeDb::open(&path).expect("open");
        db.record(&OutcomeRecord::new("h", "r", Outcome::Incomplete, 7)).expect("insert");
    }
    let db = OutcomeDb::open(&path).expect("reopen");
    assert_eq!(db.lookup("h", "r").expect("lookup").expect("row").outcome, Outcome::Incomplete);
}

#[test]
fn legacy_timeout_token_is_read_back() {
    let db = OutcomeDb::open_in_memory().expect("open");
    db.connection()
        .execute(
            "INSERT INTO outcomes (source_hash, renderer, outcome, elapsed_ms, detail, recorded_at)
             VALUES ('h', 'r', 'timedout', 5000, NULL, '2024-01-01T00:00:00Z')",
            [],
        )
        .expect("raw insert");
    assert_eq!(db.lookup("h", "r").expect("lookup").expect("row").outcome, Outcome::Timeout);
}

#[test]
fn open_rejects_newer_schema() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("future.db");
    {
        let conn = Connection::open(&path).expect("open raw sqlite db");
        conn.pragma_update(None, "user_version", 99_i32).expect("set user_version pragma");
    }

    match OutcomeDb::open(&path) {
        Err(DbError::UnsupportedSchemaVersion { found, min_supported, max_supported }) => {
            assert_eq!(found, 99);
            assert_eq!(min_supported, 0);
            assert_eq!(max_supported, 2);
        }
        Err(err) => panic!("expected UnsupportedSchemaVersion, got {err}"),
        Ok(_) => panic!("expected UnsupportedSchemaVersion, got Ok(_)"),
    }
}

#[test]
fn hashes_are_stable_hex_digests() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    let raw = ProgramInput::raw("void main() {}");
    assert_eq!(program_hash(&raw).expect("hash"), sha256_hex(b"void main() {}"));

    let structured = ProgramInput::from_value(&serde_json::json!({"image_code": "void main() {}"}))
        .expect("structured");
    assert_ne!(program_hash(&structured).expect("hash"), program_hash(&raw).expect("hash"));
}
