//! E2E tests for `trust watch`.
//!
//! Each run is bounded with `--exit-after`; directory users come from an
//! `--offline-users` file.

mod common;

use common::{store_session, trust_cmd_at, write_users, USERS};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::thread;
use std::time::Duration;

#[test]
fn role_redirect_lands_on_default_page() {
    let home = tempfile::tempdir().expect("temp home");
    let users = write_users(home.path(), USERS);
    store_session(home.path(), "bruno@example.com");

    trust_cmd_at(home.path())
        .args(["watch", "--path", "/clientes/sucursales", "--exit-after", "1500"])
        .arg("--offline-users")
        .arg(&users)
        .assert()
        .success()
        .stdout(contains("/dashboard: allow [Bruno Díaz (branch_admin)]"))
        .stdout(contains("/clientes/sucursales: allow").not());
}

#[test]
fn query_string_does_not_deny_allowed_page() {
    let home = tempfile::tempdir().expect("temp home");
    let users = write_users(home.path(), USERS);
    store_session(home.path(), "ana@example.com");

    trust_cmd_at(home.path())
        .args(["watch", "--path", "/clientes/calendario?mes=3", "--exit-after", "1500"])
        .arg("--offline-users")
        .arg(&users)
        .assert()
        .success()
        .stdout(contains("/clientes/calendario?mes=3: allow [Ana Ruiz (inspector)]"))
        .stdout(contains("/dashboard").not());
}

#[test]
fn logout_in_another_process_returns_to_login() {
    let home = tempfile::tempdir().expect("temp home");
    let users = write_users(home.path(), USERS);
    store_session(home.path(), "carla@example.com");

    let other_home = home.path().to_path_buf();
    let other = thread::spawn(move || {
        thread::sleep(Duration::from_millis(800));
        trust_cmd_at(&other_home).arg("logout").assert().success();
    });

    trust_cmd_at(home.path())
        .args(["watch", "--path", "/ajustes", "--exit-after", "3000"])
        .arg("--offline-users")
        .arg(&users)
        .assert()
        .success()
        .stdout(contains("/ajustes: allow [Carla Gómez (general_admin)]"))
        .stdout(contains("\n/: allow"));

    other.join().expect("logout thread");
}

#[test]
fn login_in_another_process_is_picked_up() {
    let home = tempfile::tempdir().expect("temp home");
    let users = write_users(home.path(), USERS);

    let other_home = home.path().to_path_buf();
    let other = thread::spawn(move || {
        thread::sleep(Duration::from_millis(800));
        store_session(&other_home, "ana@example.com");
    });

    trust_cmd_at(home.path())
        .args(["watch", "--path", "/", "--exit-after", "3000"])
        .arg("--offline-users")
        .arg(&users)
        .assert()
        .success()
        .stdout(contains("/: allow [no directory user]"))
        .stdout(contains("/: allow [Ana Ruiz (inspector)]"));

    other.join().expect("writer thread");
}
