use std::time::{Duration, SystemTime, UNIX_EPOCH};

use embedsql::prelude::*;
use embedsql::{BindErrorKind, ConnectionErrorKind, QueryErrorKind, ReadErrorKind};
use tempfile::TempDir;

fn temp_db(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn create_insert_select_scenario() {
    let db = Database::open_memory().expect("open memory db");
    db.execute("CREATE TABLE t (a INTEGER, b TEXT)").unwrap();

    let mut insert = db.prepare("INSERT INTO t VALUES (?, ?)").unwrap();
    insert.bind(1, 42_i64).unwrap();
    insert.bind(2, "hello").unwrap();
    assert!(!insert.run().unwrap());
    assert_eq!(insert.changes(), 1);
    assert_eq!(insert.last_insert_rowid(), 1);

    let mut select = db.prepare("SELECT a, b FROM t").unwrap();
    assert!(select.run().unwrap());
    assert_eq!(select.get::<i64>(0).unwrap(), 42);
    assert_eq!(select.get::<String>(1).unwrap(), "hello");
    assert!(!select.run().unwrap());
}

#[test]
fn every_value_variant_round_trips() {
    let db = Database::open_memory().unwrap();
    let when = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    let mut stmt = db
        .prepare("SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?")
        .unwrap();
    stmt.bind(1, true).unwrap();
    stmt.bind(2, -5_i8).unwrap();
    stmt.bind(3, -300_i16).unwrap();
    stmt.bind(4, -70_000_i32).unwrap();
    stmt.bind(5, i64::MIN).unwrap();
    stmt.bind(6, u8::MAX).unwrap();
    stmt.bind(7, u16::MAX).unwrap();
    stmt.bind(8, u32::MAX).unwrap();
    stmt.bind(9, i64::MAX as u64).unwrap();
    stmt.bind(10, 2.5_f64).unwrap();
    stmt.bind(11, "héllo").unwrap();
    stmt.bind(12, vec![0_u8, 1, 2, 255]).unwrap();
    stmt.bind(13, when).unwrap();
    stmt.bind(14, Value::Null).unwrap();

    assert!(stmt.run().unwrap());
    assert!(stmt.get::<bool>(0).unwrap());
    assert_eq!(stmt.get::<i8>(1).unwrap(), -5);
    assert_eq!(stmt.get::<i16>(2).unwrap(), -300);
    assert_eq!(stmt.get::<i32>(3).unwrap(), -70_000);
    assert_eq!(stmt.get::<i64>(4).unwrap(), i64::MIN);
    assert_eq!(stmt.get::<u8>(5).unwrap(), u8::MAX);
    assert_eq!(stmt.get::<u16>(6).unwrap(), u16::MAX);
    assert_eq!(stmt.get::<u32>(7).unwrap(), u32::MAX);
    assert_eq!(stmt.get::<u64>(8).unwrap(), i64::MAX as u64);
    assert_eq!(stmt.get::<f64>(9).unwrap(), 2.5);
    assert_eq!(stmt.get::<String>(10).unwrap(), "héllo");
    assert_eq!(stmt.get::<Vec<u8>>(11).unwrap(), vec![0, 1, 2, 255]);
    assert_eq!(stmt.get::<SystemTime>(12).unwrap(), when);
    assert_eq!(stmt.get::<Value>(13).unwrap(), Value::Null);
}

#[test]
fn empty_optionals_round_trip_to_none() {
    let db = Database::open_memory().unwrap();
    let mut stmt = db.prepare("SELECT ?, ?, ?, ?").unwrap();
    stmt.bind(1, None::<String>).unwrap();
    stmt.bind(2, None::<SystemTime>).unwrap();
    stmt.bind(3, None::<i32>).unwrap();
    stmt.bind(4, Some(0_i32)).unwrap();

    assert!(stmt.run().unwrap());
    assert_eq!(stmt.get::<Option<String>>(0).unwrap(), None);
    assert_eq!(stmt.get::<Option<SystemTime>>(1).unwrap(), None);
    assert_eq!(stmt.get::<Option<i32>>(2).unwrap(), None);
    // Zero is a value, not an absence
    assert_eq!(stmt.get::<Option<i32>>(3).unwrap(), Some(0));
}

#[test]
fn unsigned_overflow_is_a_mismatch() {
    let db = Database::open_memory().unwrap();
    let mut stmt = db.prepare("SELECT ?").unwrap();
    match stmt.bind(1, u64::MAX).unwrap_err() {
        Error::Bind(e) => {
            assert_eq!(e.kind, BindErrorKind::Mismatch);
            assert_eq!(e.index, 1);
        }
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[test]
fn oversized_payloads_fail_with_range() {
    let config = DatabaseConfig::memory().max_length(16);
    let db = Database::open_config(config).unwrap();
    let mut stmt = db.prepare("SELECT ?").unwrap();

    stmt.bind_blob(1, &[7; 16]).unwrap();

    let err = stmt.bind_blob(1, &[7; 17]).unwrap_err();
    match err {
        Error::Bind(e) => {
            assert!(e.is_range());
            assert_eq!(e.index, 1);
        }
        other => panic!("expected bind error, got {other:?}"),
    }

    let long = "x".repeat(17);
    assert!(matches!(
        stmt.bind_text(1, &long),
        Err(Error::Bind(e)) if e.kind == BindErrorKind::Range
    ));
    assert!(matches!(
        stmt.bind(1, long.as_str()),
        Err(Error::Bind(e)) if e.kind == BindErrorKind::Range
    ));
}

#[test]
fn open_creates_file_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "persist.db");

    {
        let db = Database::open(path.clone(), OpenFlags::empty()).unwrap();
        db.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v BLOB)").unwrap();
        let mut stmt = db.prepare("INSERT INTO kv VALUES (?, ?)").unwrap();
        stmt.bind(1, "key").unwrap();
        stmt.bind_blob(2, b"value").unwrap();
        stmt.run().unwrap();
    }
    assert!(std::path::Path::new(&path).exists());

    let db = Database::open(path, OpenFlags::READ_ONLY).unwrap();
    let mut stmt = db.prepare("SELECT v FROM kv WHERE k = :k").unwrap();
    let k = stmt.parameter_index(":k").unwrap();
    stmt.bind(k, "key").unwrap();
    assert!(stmt.run().unwrap());
    assert_eq!(stmt.get::<Vec<u8>>(0).unwrap(), b"value".to_vec());
}

#[test]
fn open_flags_accept_raw_bits() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "bits.db");
    Database::open(path.clone(), 0_u32).unwrap();

    let db = Database::open(path, OpenFlags::READ_ONLY_BIT | OpenFlags::SHARED_CACHE_BIT).unwrap();
    assert!(db.config().flags.read_only);
    assert!(db.config().flags.shared_cache);
    db.execute("SELECT 1").unwrap();
}

#[test]
fn read_only_database_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "ro.db");
    Database::open(path.clone(), OpenFlags::empty())
        .unwrap()
        .execute("CREATE TABLE t (x INTEGER)")
        .unwrap();

    let db = Database::open(path, OpenFlags::READ_ONLY).unwrap();
    match db.execute("INSERT INTO t VALUES (1)").unwrap_err() {
        Error::Query(e) => {
            assert_eq!(e.kind, QueryErrorKind::ReadOnly);
            assert_eq!(e.code, Some(8));
            assert_eq!(e.message, "attempt to write a readonly database");
        }
        other => panic!("expected query error, got {other:?}"),
    }
}

#[test]
fn open_failure_carries_native_code_and_message() {
    let dir = tempfile::tempdir().unwrap();

    let err = Database::open(temp_db(&dir, "missing.db"), OpenFlags::READ_ONLY).unwrap_err();
    match err {
        Error::Connection(e) => {
            assert_eq!(e.kind, ConnectionErrorKind::Open);
            assert_eq!(e.code, Some(14));
            assert_eq!(e.message, "unable to open database file");
        }
        other => panic!("expected connection error, got {other:?}"),
    }

    let garbage = temp_db(&dir, "garbage.db");
    std::fs::write(&garbage, [0x5a; 2048]).unwrap();
    let err = Database::open(garbage, OpenFlags::empty()).unwrap_err();
    assert_eq!(err.code(), Some(26));
    assert_eq!(err.message(), "file is not a database");
    assert!(!err.is_retryable());
}

#[test]
fn lock_conflicts_are_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "locks.db");

    let writer = Database::open(path.clone(), OpenFlags::empty()).unwrap();
    writer.execute("CREATE TABLE t (x INTEGER)").unwrap();
    let tx = writer.transaction(TransactionMode::Immediate).unwrap();

    let other = Database::open(path, OpenFlags::empty()).unwrap();
    let err = other.execute("INSERT INTO t VALUES (1)").unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.code(), Some(5));
    assert_eq!(err.message(), "database is locked");

    tx.commit().unwrap();
    other.execute("INSERT INTO t VALUES (1)").unwrap();
}

#[test]
fn busy_commit_keeps_writes_for_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "commit.db");

    let writer = Database::open(path.clone(), OpenFlags::empty()).unwrap();
    writer.execute("CREATE TABLE t (x INTEGER)").unwrap();
    writer.execute("INSERT INTO t VALUES (0)").unwrap();

    // A reader parked mid-scan holds a shared lock
    let reader = Database::open(path, OpenFlags::empty()).unwrap();
    let mut scan = reader.prepare("SELECT x FROM t").unwrap();
    assert!(scan.run().unwrap());

    let tx = writer.transaction(TransactionMode::Deferred).unwrap();
    tx.execute("INSERT INTO t VALUES (1)").unwrap();
    let err = tx.commit().unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.code(), Some(5));
    assert!(writer.in_transaction());

    drop(scan);
    writer.execute("COMMIT").unwrap();
    assert!(!writer.in_transaction());

    let mut count = writer.prepare("SELECT count(*) FROM t WHERE x = 1").unwrap();
    assert!(count.run().unwrap());
    assert_eq!(count.get::<i64>(0).unwrap(), 1);
}

#[test]
fn busy_timeout_reopens_on_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "timeout.db");

    let mut db = Database::open(path.clone(), OpenFlags::empty()).unwrap();
    db.execute("CREATE TABLE t (x INTEGER)").unwrap();
    db.execute("INSERT INTO t VALUES (1)").unwrap();

    db.set_busy_timeout(Duration::from_millis(500)).unwrap();
    assert!(db.is_open());
    assert_eq!(db.path(), path);
    assert_eq!(db.config().busy_timeout_duration(), Some(Duration::from_millis(500)));

    db.execute("INSERT INTO t VALUES (2)").unwrap();
    let mut count = db.prepare("SELECT count(*) FROM t").unwrap();
    assert!(count.run().unwrap());
    assert_eq!(count.get::<i64>(0).unwrap(), 2);
}

#[test]
fn busy_timeout_waits_for_lock_holder() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "wait.db");

    let holder = Database::open(path.clone(), OpenFlags::empty()).unwrap();
    holder.execute("CREATE TABLE t (x INTEGER)").unwrap();

    let mut waiter = Database::open(path, OpenFlags::empty()).unwrap();
    waiter.set_busy_timeout(Duration::from_millis(200)).unwrap();

    let _tx = holder.transaction(TransactionMode::Exclusive).unwrap();
    let start = std::time::Instant::now();
    let err = waiter.execute("INSERT INTO t VALUES (1)").unwrap_err();
    assert!(err.is_retryable());
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[test]
fn failed_reopen_leaves_database_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "vanishing.db");
    Database::open(path.clone(), OpenFlags::empty())
        .unwrap()
        .execute("CREATE TABLE t (x INTEGER)")
        .unwrap();

    let mut db = Database::open(path.clone(), OpenFlags::READ_ONLY).unwrap();
    std::fs::remove_file(&path).unwrap();

    match db.set_busy_timeout(Duration::from_millis(100)).unwrap_err() {
        Error::Connection(e) => {
            assert_eq!(e.kind, ConnectionErrorKind::Reopen);
            assert_eq!(e.code, Some(14));
            assert_eq!(e.path.as_deref(), Some(path.as_str()));
        }
        other => panic!("expected connection error, got {other:?}"),
    }

    assert!(!db.is_open());
    let err = db.execute("SELECT 1").unwrap_err();
    assert!(err.is_closed());
    assert!(db.prepare("SELECT 1").unwrap_err().is_closed());
}

#[test]
fn dropped_transaction_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "txn.db");
    let db = Database::open(path, OpenFlags::empty()).unwrap();
    db.execute("CREATE TABLE t (x INTEGER)").unwrap();
    db.execute("INSERT INTO t VALUES (1)").unwrap();

    {
        let tx = db.transaction(TransactionMode::Deferred).unwrap();
        tx.execute("DELETE FROM t").unwrap();
        tx.execute("INSERT INTO t VALUES (99)").unwrap();
    }

    let mut stmt = db.prepare("SELECT x FROM t").unwrap();
    let mut seen = Vec::new();
    while stmt.run().unwrap() {
        seen.push(stmt.get::<i64>(0).unwrap());
    }
    assert_eq!(seen, vec![1]);
}

#[test]
fn config_loaded_from_json_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db(&dir, "json.db");
    let json = serde_json::json!({
        "path": path,
        "busy_timeout_ms": 50,
        "max_length": 1024,
    })
    .to_string();

    let config = DatabaseConfig::from_json(&json).unwrap();
    let db = Database::open_config(config).unwrap();
    assert_eq!(db.config().busy_timeout_ms, 50);

    let mut stmt = db.prepare("SELECT ?").unwrap();
    assert!(stmt.bind_blob(1, &[0; 1025]).unwrap_err().to_string().contains("Bind error"));
}

#[test]
fn invalid_utf8_text_is_readable_as_bytes() {
    let db = Database::open_memory().unwrap();
    let mut stmt = db.prepare("SELECT CAST(x'ff61' AS TEXT)").unwrap();
    assert!(stmt.run().unwrap());

    match stmt.get::<String>(0).unwrap_err() {
        Error::Read(e) => assert_eq!(e.kind, ReadErrorKind::Type),
        other => panic!("expected read error, got {other:?}"),
    }
    assert_eq!(stmt.get::<Vec<u8>>(0).unwrap(), vec![0xff, 0x61]);
}

#[test]
fn prepare_refuses_a_second_statement() {
    let db = Database::open_memory().unwrap();
    db.execute("CREATE TABLE t (x INTEGER)").unwrap();

    let err = db.prepare("INSERT INTO t VALUES (1); DROP TABLE t").unwrap_err();
    match err {
        Error::Query(q) => assert_eq!(q.kind, QueryErrorKind::Misuse),
        other => panic!("expected query error, got {other:?}"),
    }

    let mut stmt = db.prepare("SELECT count(*) FROM t; -- trailing comment").unwrap();
    assert!(stmt.run().unwrap());
    assert_eq!(stmt.get::<i64>(0).unwrap(), 0);
}
