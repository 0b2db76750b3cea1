#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, rows: &[&str]) -> String {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type,actor,order,target,value").unwrap();
    for row in rows {
        writeln!(csv, "{}", row).unwrap();
    }

    let mut cmd = Command::new(cargo_bin!("storefront"));
    cmd.arg(csv.path())
        .arg("--db-path")
        .arg(db_path)
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json")
        .arg("--admin")
        .arg("1")
        .arg("--sequential-ids")
        .env_remove("STOREFRONT_ADMINS");

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: buyer pays, nobody decides yet
    let stdout1 = run(
        &db_path,
        &[
            "select_product,10,,P0001,",
            "advance,10,,,pay",
            "select_payment,10,,PM0001,",
            "reference,10,,,TXN1",
        ],
    );
    assert!(stdout1.contains("1,decision_request,ORD-00000001,"));

    // 2. Second run: the pending order is presented again and can be decided
    let stdout2 = run(&db_path, &["decision,1,ORD-00000001,,approve"]);
    assert!(stdout2.contains("1,decision_request,ORD-00000001,"));
    assert!(stdout2.contains("10,delivered,ORD-00000001,"));

    // 3. Third run: stock and the consumed reference survived, seeding did
    //    not reset them, and ids keep counting
    let stdout3 = run(
        &db_path,
        &[
            "select_product,11,,P0001,",
            "select_product,12,,P0002,",
            "advance,12,,,pay",
            "select_payment,12,,PM0001,",
            "reference,12,,,txn1",
            "list_orders,1,,,",
        ],
    );
    assert!(stdout3.contains("11,error,,Product P0001 is out of stock"));
    assert!(stdout3.contains("12,order_created,ORD-00000003,"));
    assert!(stdout3.contains("12,duplicate_reference,ORD-00000003,"));
    assert!(stdout3.contains("1,admin_ack,,ORD-00000001 | Ebook | approved"));
}
