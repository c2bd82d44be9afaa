//! End-to-end scenarios for the typed accessor surface, each running
//! against a session opened on a real configuration file.

use std::io::Write;

use luaconf::{Config, Error};

/// Open a session on a temporary file holding `src`; keep the file alive
/// alongside the session.
fn open_src(src: &str) -> (Config, tempfile::NamedTempFile) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{src}").unwrap();
    let config = Config::from_file(file.path()).unwrap();
    (config, file)
}

#[test]
fn string_entry_reads_back() {
    let (mut cfg, _f) = open_src("last_name = \"Handel\"");
    assert_eq!(cfg.get::<String>("last_name").unwrap(), "Handel");
}

#[test]
fn integral_float_reads_as_integer() {
    let (mut cfg, _f) = open_src("birth_year = 1685.0");
    assert_eq!(cfg.get::<i64>("birth_year").unwrap(), 1685);
}

#[test]
fn fractional_float_is_not_an_integer() {
    let (mut cfg, _f) = open_src("birth_year = 1685.5");
    let err = cfg.get::<i64>("birth_year").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert!(err.to_string().contains("is not an integer"), "{err}");
}

#[test]
fn satisfied_constraint_returns_the_value() {
    let (mut cfg, _f) = open_src("death_age = 74");
    let age: i64 = cfg.get_checked("death_age", "v >= 0 and v < 150").unwrap();
    assert_eq!(age, 74);
}

#[test]
fn violated_constraint_carries_the_predicate_text() {
    let (mut cfg, _f) = open_src("death_age = 74");
    let err = cfg.get_checked::<i64>("death_age", "v < 50").unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation { .. }));
    let msg = err.to_string();
    assert!(msg.contains("      v < 50"), "{msg}");
    assert!(msg.contains("\"death_age\""), "{msg}");
}

#[test]
fn sequence_constraint_holds_on_every_element() {
    let (mut cfg, _f) = open_src(
        "compositions = { concerti_grossi_op_6 = {1,2,3,4,5,6,7,8,9,10,11,12} }",
    );
    let opus: Vec<i64> = cfg
        .get_checked("compositions.concerti_grossi_op_6", "v < 13")
        .unwrap();
    assert_eq!(opus, (1..=12).collect::<Vec<i64>>());
}

#[test]
fn sequence_constraint_failure_names_the_first_failing_element() {
    let (mut cfg, _f) = open_src(
        "compositions = { concerti_grossi_op_6 = {1,2,3,4,5,6,7,8,9,10,11,12} }",
    );
    let err = cfg
        .get_checked::<Vec<i64>>("compositions.concerti_grossi_op_6", "v < 5")
        .unwrap_err();
    assert!(
        err.to_string().contains("\"compositions.concerti_grossi_op_6[5]\""),
        "{err}"
    );
}

#[test]
fn entry_list_is_sorted_lexicographically() {
    let (cfg, _f) =
        open_src("name = { first = \"George\", middle = \"Frideric\", last = \"Handel\" }");
    assert_eq!(
        cfg.get_entry_list("name").unwrap(),
        vec!["first", "last", "middle"]
    );
}

#[test]
fn default_on_empty_file_is_recorded() {
    let (mut cfg, _f) = open_src("");
    assert!(cfg.get_or::<bool>("show", "", true).unwrap());
    assert!(cfg.lua_definition().contains("show = true"));
}

// ── Laws ──────────────────────────────────────────────────────────────────

#[test]
fn absent_entry_yields_the_default_and_records_it() {
    let (mut cfg, _f) = open_src("present = 1");
    assert!(!cfg.exists("absent"));
    assert_eq!(cfg.get_or::<i64>("absent", "", 7).unwrap(), 7);
    assert!(cfg.read_entry_list().contains(&"absent".to_owned()));
}

#[test]
fn get_and_set_agree() {
    let (mut cfg, _f) = open_src("pi = 3.25");
    let direct: f64 = cfg.get("pi").unwrap();
    let mut stored = 0.0f64;
    cfg.set("pi", &mut stored).unwrap();
    assert_eq!(direct, stored);
}

#[test]
fn prefixed_read_equals_unprefixed_full_name() {
    let (mut cfg, _f) = open_src("p = { q = { r = 5 } }");
    let full: i64 = cfg.get("p.q.r").unwrap();
    cfg.set_prefix("p.");
    let prefixed: i64 = cfg.get("q.r").unwrap();
    assert_eq!(full, prefixed);
}

#[test]
fn numeric_entry_also_reads_as_string() {
    let (mut cfg, _f) = open_src("birth_year = 1685");
    assert_eq!(cfg.get::<String>("birth_year").unwrap(), "1685");
}

#[test]
fn constraints_apply_to_string_sequences() {
    let (mut cfg, _f) = open_src("nationality = { \"German\", \"British\" }");
    let ok: Vec<String> = cfg
        .get_checked("nationality", "ops_in(v, {'German', 'British'})")
        .unwrap();
    assert_eq!(ok, vec!["German", "British"]);

    let err = cfg
        .get_checked::<Vec<String>>("nationality", "v == 'German'")
        .unwrap_err();
    assert!(err.to_string().contains("\"nationality[2]\""), "{err}");
}

#[test]
fn ops_in_note_appears_in_constraint_errors() {
    let (mut cfg, _f) = open_src("x = 9");
    let err = cfg.get_checked::<i64>("x", "ops_in(v, {1, 2, 3})").unwrap_err();
    assert!(err.to_string().contains("Note: 'ops_in(v, array)'"), "{err}");
}

#[test]
fn config_file_can_use_ops_in_itself() {
    // ops_in is predefined before the file is evaluated.
    let (mut cfg, _f) = open_src("ok = ops_in(2, {1, 2, 3})");
    assert!(cfg.get::<bool>("ok").unwrap());
}

#[test]
fn sessions_are_independent() {
    let (mut a, _fa) = open_src("x = 1");
    let (mut b, _fb) = open_src("x = 2");
    a.do_string("x = 10").unwrap();
    assert_eq!(a.get::<i64>("x").unwrap(), 10);
    assert_eq!(b.get::<i64>("x").unwrap(), 2);
}
