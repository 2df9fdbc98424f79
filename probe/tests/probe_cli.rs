use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_probe_refuses_to_run_without_key() {
    Command::cargo_bin("ejabberd-probe")
        .unwrap()
        .env_remove("JWT_JWK_B64")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required environment variable JWT_JWK_B64"));
}

#[test]
fn test_probe_rejects_malformed_key_before_any_request() {
    Command::cargo_bin("ejabberd-probe")
        .unwrap()
        .env("JWT_JWK_B64", "bm90IGpzb24=")
        .env("EJABBERD_HOST", "127.0.0.1")
        .env("EJABBERD_PORT", "1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed key material"))
        .stdout(predicate::str::contains("Testing against").not());
}
