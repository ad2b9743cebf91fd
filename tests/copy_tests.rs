//! Tests for copying the staging tree, using the real `cp`.

mod helpers;

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};

use bootroot::copy::{copy_tree, verify_copy};
use bootroot::error::BuildError;
use bootroot::process::SystemRunner;
use helpers::{create_mock_bootroot, TestEnv};

#[test]
fn test_copy_preserves_structure() {
    let env = TestEnv::new();
    create_mock_bootroot(&env.staging);
    fs::set_permissions(
        env.staging.join("sbin/init"),
        fs::Permissions::from_mode(0o750),
    )
    .unwrap();
    let dest = env.tmp_dir.join("mnt");
    fs::create_dir_all(&dest).unwrap();

    copy_tree(&SystemRunner, &env.staging, &dest).unwrap();

    let mode = fs::metadata(dest.join("sbin/init")).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o750);
    assert_eq!(
        fs::read_link(dest.join("usr/lib/init")).unwrap(),
        std::path::Path::new("../sbin/init")
    );
    assert!(dest.join("dev").is_dir());

    // etc, etc/system, sbin, sbin/init, usr, usr/lib, usr/lib/init, dev
    assert_eq!(verify_copy(&env.staging, &dest).unwrap(), 8);
}

#[test]
fn test_copy_leaves_staging_untouched() {
    let env = TestEnv::new();
    create_mock_bootroot(&env.staging);
    let dest = env.tmp_dir.join("mnt");
    fs::create_dir_all(&dest).unwrap();

    copy_tree(&SystemRunner, &env.staging, &dest).unwrap();

    assert_eq!(
        fs::read_to_string(env.staging.join("etc/system")).unwrap(),
        "set noexec_user_stack=1\n"
    );
}

#[test]
fn test_copy_failure_status() {
    let env = TestEnv::new();
    let missing = env.tmp_dir.join("no-such-staging");
    let dest = env.tmp_dir.join("mnt");
    fs::create_dir_all(&dest).unwrap();

    let err = copy_tree(&SystemRunner, &missing, &dest).unwrap_err();

    assert!(matches!(err, BuildError::CopyFailure { status } if status != 0));
}

#[test]
fn test_verify_detects_missing_entry() {
    let env = TestEnv::new();
    create_mock_bootroot(&env.staging);
    let dest = env.tmp_dir.join("mnt");
    fs::create_dir_all(&dest).unwrap();

    let err = verify_copy(&env.staging, &dest).unwrap_err();

    assert!(matches!(err, BuildError::CopyIncomplete(_)));
}

#[test]
fn test_verify_detects_type_mismatch() {
    let env = TestEnv::new();
    fs::write(env.staging.join("init"), "#!/bin/sh\n").unwrap();
    let dest = env.tmp_dir.join("mnt");
    fs::create_dir_all(&dest).unwrap();
    symlink("/bin/sh", dest.join("init")).unwrap();

    let err = verify_copy(&env.staging, &dest).unwrap_err();

    match err {
        BuildError::CopyIncomplete(path) => assert_eq!(path, std::path::Path::new("init")),
        other => panic!("unexpected error {:?}", other),
    }
}
