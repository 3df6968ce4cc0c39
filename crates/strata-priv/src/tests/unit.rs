//! Unit tests for credentials and the system privilege backend.

use std::cell::Cell;
use std::sync::Mutex;

use nix::errno::Errno;
use nix::unistd::{getegid, geteuid};
use rstest::rstest;

use crate::privileges::drop_once;
use crate::{Credential, PrivilegeError, Privileges, SystemPrivileges};

#[rstest]
#[case::unprivileged(Credential::new(1000, 1000), false)]
#[case::root_user(Credential::new(0, 1000), true)]
#[case::root_group(Credential::new(1000, 0), true)]
fn credential_reports_root_identities(#[case] credential: Credential, #[case] expected: bool) {
    assert_eq!(credential.is_root(), expected);
}

#[test]
fn credential_displays_as_uid_gid_pair() {
    assert_eq!(Credential::new(1234, 5678).to_string(), "1234:5678");
}

#[test]
fn system_privileges_mirror_effective_uid() {
    let privileges = SystemPrivileges::new();
    assert_eq!(privileges.is_privileged(), geteuid().is_root());
}

// Dropping to the current identity is a no-op for the host, which lets the
// one-shot guard be exercised without changing who the test process runs as.
#[test]
fn dropping_twice_is_rejected() {
    let mut privileges = SystemPrivileges::new();
    let current = Credential::new(geteuid().as_raw(), getegid().as_raw());

    privileges
        .drop_to(current)
        .expect("dropping to the current identity succeeds");
    let error = privileges
        .drop_to(current)
        .expect_err("a second drop must be refused");

    assert!(
        matches!(error, PrivilegeError::AlreadyDropped),
        "unexpected error: {error}"
    );
}

#[test]
fn failed_drop_can_be_retried() {
    let state = Mutex::new(false);
    let attempts = Cell::new(0_u32);
    let failing = || -> Result<(), PrivilegeError> {
        attempts.set(attempts.get() + 1);
        Err(PrivilegeError::Drop {
            credential: Credential::new(1000, 1000),
            call: "setgid",
            source: Errno::EPERM,
        })
    };
    let succeeding = || -> Result<(), PrivilegeError> {
        attempts.set(attempts.get() + 1);
        Ok(())
    };

    let first = drop_once(&state, failing).expect_err("the switch fails");
    assert!(matches!(first, PrivilegeError::Drop { call: "setgid", .. }));
    drop_once(&state, succeeding).expect("a failed drop leaves the guard open");
    let repeated = drop_once(&state, succeeding).expect_err("the guard is now closed");

    assert!(matches!(repeated, PrivilegeError::AlreadyDropped));
    assert_eq!(attempts.get(), 2);
}

#[test]
fn unknown_uid_is_reported() {
    let privileges = SystemPrivileges::new();
    let uid = u32::MAX - 7;
    match privileges.environment_for(uid) {
        Err(PrivilegeError::UnknownUser { uid: reported }) => assert_eq!(reported, uid),
        other => panic!("expected UnknownUser, got {other:?}"),
    }
}

#[test]
fn drop_error_names_the_failing_call() {
    let error = PrivilegeError::Drop {
        credential: Credential::new(1000, 1000),
        call: "setuid",
        source: nix::errno::Errno::EPERM,
    };
    let message = error.to_string();
    assert!(message.contains("1000:1000"), "missing credential: {message}");
    assert!(message.contains("setuid"), "missing call: {message}");
}
