mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn storefront() -> Command {
    let mut cmd = Command::new(cargo_bin!());
    cmd.env_remove("STOREFRONT_ADMINS").env("RUST_LOG", "info");
    cmd
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = storefront();
    cmd.arg("tests/fixtures/events.csv")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--admin")
        .arg("1")
        .arg("--sequential-ids");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("recipient,kind,order,text"))
        // Sliders go out ahead of the categories on start
        .stdout(predicate::str::contains(
            "10,slider,,[photo: https://img.example.com/sale.png] [Sale](https://example.com/sale)",
        ))
        .stdout(predicate::str::is_match("(?s)10,slider,.*10,categories,")?)
        .stdout(predicate::str::contains(
            "10,order_created,ORD-00000001,Order #ORD-00000001 created for Ebook.",
        ))
        .stdout(predicate::str::contains("1,decision_request,ORD-00000001,"))
        .stdout(predicate::str::contains("UTR: TXN-0001"))
        // Delivered exactly once despite the repeated decision
        .stdout(predicate::str::contains(
            "10,delivered,ORD-00000001,Order ORD-00000001 approved! Thank you! https://example.com/ebook",
        ))
        .stdout(predicate::str::contains("10,delivered").count(1))
        .stdout(predicate::str::contains(
            "1,admin_ack,ORD-00000001,Order ORD-00000001 not found / already processed",
        ))
        // Last unit is gone
        .stdout(predicate::str::contains(
            "11,error,,Product P0001 is out of stock",
        ))
        // Approved reference cannot be reused, whatever the case
        .stdout(predicate::str::contains("12,duplicate_reference,ORD-"))
        // Buyers cannot decide orders
        .stdout(predicate::str::contains(
            "12,error,,User 12 is not allowed to perform this action",
        ))
        .stdout(predicate::str::contains(
            "1,admin_ack,,ORD-00000001 | Ebook | approved",
        ));

    Ok(())
}

#[test]
fn test_cli_admins_from_env() {
    let mut cmd = storefront();
    cmd.env("STOREFRONT_ADMINS", "5,1")
        .arg("tests/fixtures/events.csv")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--sequential-ids");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("5,decision_request,ORD-00000001,"))
        .stdout(predicate::str::contains("1,decision_request,ORD-00000001,"));
}

#[test]
fn test_cli_skips_malformed_rows() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type,actor,order,target,value").unwrap();
    writeln!(csv, "teleport,10,,,").unwrap();
    writeln!(csv, "start,not-a-user,,,").unwrap();
    writeln!(csv, "decision,1,,,approve").unwrap();
    writeln!(csv, "browse,10,,,Courses").unwrap();

    let mut cmd = storefront();
    cmd.arg(csv.path())
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--admin")
        .arg("1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "10,product_card,,[P0002] Video Course | 999 | Unlimited",
        ))
        .stderr(predicate::str::contains("Skipping unreadable event"));
}

#[test]
fn test_cli_rejects_unknown_session_policy() {
    let mut cmd = storefront();
    cmd.arg("tests/fixtures/events.csv")
        .arg("--session-policy")
        .arg("queue");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown session policy"));
}

#[test]
fn test_cli_generated_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.csv");
    common::generate_events_csv(&path, 20).unwrap();

    let mut cmd = storefront();
    cmd.arg(&path)
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--admin")
        .arg("1")
        .arg("--sequential-ids");

    // Only one unit of P0001: the first buyer gets it, everyone else is refused.
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches(",delivered,").count(), 1);
    assert_eq!(stdout.matches("is out of stock").count(), 19);
}
