//! End-to-end CLI tests for the offline commands (no bridge required).

use assert_cmd::Command;
use tempfile::TempDir;

fn lexsync() -> Command {
    Command::cargo_bin("lexsync").unwrap()
}

#[test]
fn init_creates_a_store_and_status_reads_it() {
    let tmp = TempDir::new().unwrap();

    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .arg("--json")
        .assert()
        .success();

    let root = tmp.path().join("kamus");
    assert!(root.join("lexicon.db").exists());

    let output = lexsync()
        .args(["status", "--json", "--project"])
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["entries"], 0);
    assert_eq!(status["pending_import"], "none");
}

#[test]
fn init_refuses_to_clobber_an_existing_store() {
    let tmp = TempDir::new().unwrap();

    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .assert()
        .success();
    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn status_without_init_reports_not_initialized() {
    let tmp = TempDir::new().unwrap();

    lexsync()
        .args(["status", "--project"])
        .arg(tmp.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn export_import_round_trip_through_the_cli() {
    let tmp = TempDir::new().unwrap();
    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .assert()
        .success();
    let root = tmp.path().join("kamus");

    // Hand-written interchange file with two entries.
    let external = root.join("incoming.lex");
    let a = "0a000000-0000-4000-8000-000000000001";
    let b = "0b000000-0000-4000-8000-000000000002";
    let mut body = String::from("{\"format_version\":2}\n");
    for (guid, lemma) in [(a, "air"), (b, "batu")] {
        body.push_str(&format!(
            "{{\"entry\":{{\"guid\":\"{guid}\",\"lemma\":\"{lemma}\",\"senses\":[],\"relations\":[],\"date_created\":\"2024-01-01T00:00:00Z\",\"date_modified\":\"2024-01-01T00:00:00Z\"}},\"content_hash\":\"x\"}}\n"
        ));
    }
    std::fs::write(&external, body).unwrap();

    lexsync()
        .args(["import"])
        .arg(&external)
        .args(["--keep-both", "--json", "--project"])
        .arg(&root)
        .assert()
        .success();

    let output = lexsync()
        .args(["export", "--json", "--project"])
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let exported: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(exported["records"], 2);

    let file = exported["file"].as_str().unwrap();
    assert!(std::path::Path::new(file).exists());
}

#[test]
fn mirror_import_deletes_local_only_entries() {
    let tmp = TempDir::new().unwrap();
    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .assert()
        .success();
    let root = tmp.path().join("kamus");

    let guid = "0c000000-0000-4000-8000-000000000003";
    let one = format!(
        "{{\"format_version\":2}}\n{{\"entry\":{{\"guid\":\"{guid}\",\"lemma\":\"cahaya\",\"senses\":[],\"relations\":[],\"date_created\":\"2024-01-01T00:00:00Z\",\"date_modified\":\"2024-01-01T00:00:00Z\"}},\"content_hash\":\"x\"}}\n"
    );
    let two = format!(
        "{one}{{\"entry\":{{\"guid\":\"0d000000-0000-4000-8000-000000000004\",\"lemma\":\"daun\",\"senses\":[],\"relations\":[],\"date_created\":\"2024-01-01T00:00:00Z\",\"date_modified\":\"2024-01-01T00:00:00Z\"}},\"content_hash\":\"x\"}}\n"
    );

    let pair = root.join("pair.lex");
    let single = root.join("single.lex");
    std::fs::write(&pair, two).unwrap();
    std::fs::write(&single, one).unwrap();

    lexsync()
        .args(["import"])
        .arg(&pair)
        .args(["--keep-both", "--project"])
        .arg(&root)
        .assert()
        .success();

    // Without --keep-both the file is mirrored, dropping the other entry.
    lexsync()
        .args(["import"])
        .arg(&single)
        .args(["--project"])
        .arg(&root)
        .assert()
        .success();

    let output = lexsync()
        .args(["status", "--json", "--project"])
        .arg(&root)
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["entries"], 1);
}

#[test]
fn send_receive_without_a_bridge_fails_with_bridge_exit_code() {
    let tmp = TempDir::new().unwrap();
    lexsync()
        .args(["init", "kamus", "--project"])
        .arg(tmp.path())
        .assert()
        .success();

    lexsync()
        .args(["send-receive", "--project"])
        .arg(tmp.path().join("kamus"))
        .args(["--bridge", "/nonexistent/lexbridge"])
        .assert()
        .failure()
        .code(3);
}
