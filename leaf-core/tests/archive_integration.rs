//! End-to-end scenarios driving the full save/load pipeline.

use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

use leaf_core::{Error, File, Op};

const TEST_KEY: &[u8] = b"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

fn int_map(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// The wall clock has microsecond resolution; separate phases that a
/// rewind must tell apart.
fn tick() {
    sleep(Duration::from_millis(2));
}

#[test]
fn test_round_trip() {
    let mut file = File::new(TEST_KEY).expect("new");
    let db = file.database_mut();
    let mut tab = db.table("test");
    tab.set_map(&int_map(&[("x", 100), ("y", 200), ("z", 300)]));
    tab.set("x", &400);

    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");
    assert!(!file.is_modified());

    let mut reopened = File::open(TEST_KEY, buf.as_slice()).expect("open");
    assert_eq!(reopened.database().log(), file.database().log());
    assert_eq!(
        reopened.database_mut().table("test").as_map::<i64>(),
        int_map(&[("x", 400), ("y", 200), ("z", 300)])
    );
}

#[test]
fn test_wrong_key_fails_auth() {
    let mut file = File::new(&[b'0'; 32]).expect("new");
    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");

    match File::open(&[b'1'; 32], buf.as_slice()) {
        Err(Error::AuthFailed) => {}
        Err(err) => panic!("unexpected error: {err}"),
        Ok(_) => panic!("expected error"),
    }
}

#[test]
fn test_distinct_keys_distinct_files() {
    let mut file1 = File::new(&[b'0'; 32]).expect("new");
    let mut file2 = File::new(&[b'1'; 32]).expect("new");

    let mut buf1 = Vec::new();
    file1.write_to(&mut buf1).expect("write");
    let mut buf2 = Vec::new();
    file2.write_to(&mut buf2).expect("write");

    // Both open to structurally equal empty databases.
    let open1 = File::open(&[b'0'; 32], buf1.as_slice()).expect("open");
    let open2 = File::open(&[b'1'; 32], buf2.as_slice()).expect("open");
    assert_eq!(open1.database().log(), open2.database().log());
    assert!(open1.database().table_names().is_empty());
}

#[test]
fn test_rewind_and_revert_visible_state() {
    let mut file = File::new(TEST_KEY).expect("new");
    let db = file.database_mut();

    let vals = int_map(&[("x", 1), ("y", 2), ("z", 3)]);
    db.table("test").set_map(&vals);
    let clk = db.time();
    tick();

    assert!(db.table("test").delete("x"));
    assert_eq!(
        db.table("test").as_map::<i64>(),
        int_map(&[("y", 2), ("z", 3)])
    );

    assert!(db.rewind(clk));
    assert_eq!(db.table("test").as_map::<i64>(), vals);
    assert!(db.is_modified());

    db.revert();
    assert_eq!(
        db.table("test").as_map::<i64>(),
        int_map(&[("y", 2), ("z", 3)])
    );
}

#[test]
fn test_repeated_rewind_applies_to_original_state() {
    let mut file = File::new(TEST_KEY).expect("new");
    let db = file.database_mut();

    db.table("test").set("a", &1);
    let t1 = db.time();
    tick();
    db.table("test").set("b", &2);
    let t2 = db.time();
    tick();
    db.table("test").set("c", &3);

    // Rewinding twice is equivalent to a single rewind to the earlier
    // point from the original state.
    assert!(db.rewind(t2));
    assert!(db.rewind(t1));
    assert_eq!(db.table("test").as_map::<i64>(), int_map(&[("a", 1)]));

    db.revert();
    assert_eq!(
        db.table("test").as_map::<i64>(),
        int_map(&[("a", 1), ("b", 2), ("c", 3)])
    );
}

#[test]
fn test_saving_a_rewound_state_commits_it() {
    let mut file = File::new(TEST_KEY).expect("new");
    file.database_mut().table("test").set("keep", &1);
    let clk = file.database_mut().time();
    tick();
    file.database_mut().table("test").set("drop", &2);

    assert!(file.database_mut().rewind(clk));
    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");

    let mut reopened = File::open(TEST_KEY, buf.as_slice()).expect("open");
    let tab = reopened.database_mut().table("test");
    assert_eq!(tab.as_map::<i64>(), int_map(&[("keep", 1)]));
}

#[test]
fn test_clear_preserves_table_across_save() {
    let mut file = File::new(TEST_KEY).expect("new");
    let db = file.database_mut();
    let mut tab = db.table("test");
    tab.set("a", &1);
    tab.clear();

    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");

    let mut reopened = File::open(TEST_KEY, buf.as_slice()).expect("open");
    let db = reopened.database_mut();
    let tab = db.get_table("test").expect("table survives a clear");
    assert_eq!(tab.len(), 0);
    assert!(tab.as_map::<i64>().is_empty());
}

#[test]
fn test_delete_table_appends_once() {
    let mut file = File::new(TEST_KEY).expect("new");
    let db = file.database_mut();
    db.table("test");

    assert!(db.delete_table("test"));
    assert!(!db.delete_table("test"));
    assert!(db.get_table("test").is_none());

    let deletes = db
        .log()
        .iter()
        .filter(|e| e.op == Op::DeleteTable)
        .count();
    assert_eq!(deletes, 1);
}

#[test]
fn test_raw_json_value_passthrough() {
    let raw = serde_json::json!([1, "two", null]);

    let mut file = File::new(TEST_KEY).expect("new");
    file.database_mut().table("test").set("raw", &raw);

    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");

    let reopened = File::open(TEST_KEY, buf.as_slice()).expect("open");
    let snap = reopened.database().snapshot();
    let stored = snap["test"]["raw"].get();
    assert_eq!(stored, r#"[1,"two",null]"#);

    let back: serde_json::Value = File::open(TEST_KEY, buf.as_slice())
        .expect("open")
        .database_mut()
        .table("test")
        .get("raw")
        .expect("present");
    assert_eq!(back, raw);
}

#[test]
fn test_history_survives_save() {
    // The log carries the full history, so a rewind target taken before a
    // save is still reachable after reopening.
    let mut file = File::new(TEST_KEY).expect("new");
    file.database_mut().table("test").set("x", &1);
    let clk = file.database_mut().time();
    tick();
    file.database_mut().table("test").set("x", &2);

    let mut buf = Vec::new();
    file.write_to(&mut buf).expect("write");

    let mut reopened = File::open(TEST_KEY, buf.as_slice()).expect("open");
    assert!(reopened.database_mut().rewind(clk));
    assert_eq!(
        reopened.database_mut().table("test").get::<i64>("x"),
        Some(1)
    );
}
