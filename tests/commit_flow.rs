//! The commit algorithm against a scratch system root.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use appliance_configd::aaa::local_users::{LocalUsers, Privilege, User};
use appliance_configd::aaa::radius::{RadiusConfig, RadiusServer};
use appliance_configd::aaa::AaaConfig;
use appliance_configd::engine::{bootstrap, CommitError, ConfigEngine, ConfigStorage};
use appliance_configd::error::{Error, ErrorKind};
use appliance_configd::system::{
    CommandOutput, DryRunShell, Shell, ShellError, SystemContext, SystemPaths,
};

fn server(ip: &str) -> RadiusServer {
    RadiusServer {
        ip: ip.to_string(),
        secret: "testing123".to_string(),
        port: 0,
    }
}

#[tokio::test]
async fn test_invalid_mutation_never_saves() {
    let h = common::engine().await;
    let before = common::snapshot(h.dir.path());
    let live = h.engine.snapshot();

    let err = h
        .engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.enabled = true;
            radius.fallback = false;
            radius.servers.clear();
            Ok(())
        })
        .await
        .unwrap_err();

    match err {
        CommitError::Rejected(errors) => {
            assert_eq!(errors, vec![Error::validation("enabling RADIUS requires at least one server")]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(common::snapshot(h.dir.path()), before);
    assert_eq!(*h.engine.snapshot(), *live);
    assert!(h.shell.lines().is_empty());
}

#[tokio::test]
async fn test_locked_engine_refuses_second_writer() {
    let h = common::engine().await;
    let guard = h.engine.admission().acquire("operator-a").unwrap();

    let err = h
        .engine
        .commit::<RadiusConfig, _>("operator-b", |radius| {
            radius.servers.push(server("10.0.0.1"));
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err, CommitError::Locked { holder: "operator-a".into() });
    assert!(h.engine.snapshot().aaa.radius.servers.is_empty());

    drop(guard);
    h.engine
        .commit::<RadiusConfig, _>("operator-b", |radius| {
            radius.servers.push(server("10.0.0.1"));
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(h.engine.admission().holder(), None);
}

#[tokio::test]
async fn test_new_user_keeps_default_admin() {
    let h = common::engine().await;

    let committed = h
        .engine
        .commit::<LocalUsers, _>("operator", |users| {
            users.0 = vec![User::new("alice", "x", Privilege::User)];
            Ok(())
        })
        .await
        .unwrap();

    let names: Vec<&str> = committed.section.users().iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "admin"]);
    let admin = committed.section.find("admin").unwrap();
    assert_eq!(admin.privilege, Privilege::Admin);
    assert_eq!(h.engine.snapshot().aaa.local_users, committed.section);

    let root = h.dir.path();
    assert!(common::read(root, "etc/passwd").contains("alice:x:1002:100::/tmp:/usr/bin/appliance-shell\n"));
    assert!(common::read(root, "etc/group").contains("users:x:100:radius,alice,admin\n"));
    assert!(common::read(root, "etc/group").contains("wheel:x:10:root,admin\n"));
    assert!(committed.diff.changes().contains(&"users[alice] added".to_string()));
}

#[tokio::test]
async fn test_admin_survives_every_mutation() {
    let h = common::engine().await;

    let steps: Vec<Vec<User>> = vec![
        vec![],
        vec![User::new("alice", "x", Privilege::Admin)],
        vec![User::new("bob", "y", Privilege::User)],
    ];
    for users in steps {
        h.engine
            .commit::<LocalUsers, _>("operator", move |current| {
                current.0 = users;
                Ok(())
            })
            .await
            .unwrap();

        let live = h.engine.snapshot();
        let admin = live.aaa.local_users.find("admin").expect("admin present");
        assert_eq!(admin.privilege, Privilege::Admin);
    }

    let err = h
        .engine
        .commit::<LocalUsers, _>("operator", |current| {
            if let Some(admin) = current.find_mut("admin") {
                admin.privilege = Privilege::User;
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CommitError::Rejected(_)));
}

#[tokio::test]
async fn test_failed_save_rolls_back() {
    let h = common::engine().await;
    h.engine
        .commit::<LocalUsers, _>("operator", |users| {
            users.0.push(User::new("bob", "y", Privilege::User));
            Ok(())
        })
        .await
        .unwrap();
    let live = h.engine.snapshot();

    h.shell.fail("userdel -f bob");
    let err = h
        .engine
        .commit::<LocalUsers, _>("operator", |users| {
            users.remove_users(&["bob".to_string()]);
            Ok(())
        })
        .await
        .unwrap_err();

    match &err {
        CommitError::Failed { errors, rollback } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind(), ErrorKind::Persistence);
            assert!(rollback.is_empty(), "{:?}", rollback);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(*h.engine.snapshot(), *live);
    assert!(common::read(h.dir.path(), "etc/passwd").contains("bob:x:1002"));
    assert_eq!(h.engine.admission().holder(), None);
}

#[tokio::test]
async fn test_failed_rollback_is_reported() {
    let h = common::engine().await;
    std::fs::remove_file(h.dir.path().join("etc/nsswitch.conf")).unwrap();

    let err = h
        .engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.fallback = true;
            Ok(())
        })
        .await
        .unwrap_err();

    let errors = err.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind(), ErrorKind::Persistence);
    assert_eq!(errors[1].kind(), ErrorKind::Rollback);
    assert!(!h.engine.snapshot().aaa.radius.fallback);
}

#[tokio::test]
async fn test_radius_server_list_rules() {
    let h = common::engine().await;
    h.engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.servers = vec![server("10.0.0.1"), server("10.0.0.2")];
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(
        common::read(h.dir.path(), "etc/raddb/server"),
        "10.0.0.1:1812 testing123\n10.0.0.2:1812 testing123\n"
    );

    let err = h
        .engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.servers.push(server("10.0.0.1"));
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.errors(),
        vec![Error::validation("duplicate RADIUS server: 10.0.0.1")]
    );

    let err = h
        .engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.remove_servers(&["10.0.0.2".to_string(), "10.0.0.9".to_string()])
        })
        .await
        .unwrap_err();
    assert_eq!(err.errors(), vec![Error::NotFound("10.0.0.9".into())]);
    assert_eq!(h.engine.snapshot().aaa.radius.servers.len(), 2);
}

#[tokio::test]
async fn test_saved_startup_is_loaded_on_next_boot() {
    let h = common::engine().await;
    assert!(h.engine.boot().first_boot);

    h.engine
        .commit::<RadiusConfig, _>("operator", |radius| {
            radius.servers.push(server("10.0.0.1"));
            Ok(())
        })
        .await
        .unwrap();
    h.engine.save_startup().unwrap();

    let booted = bootstrap(h.engine.storage(), None, h.engine.system()).await.unwrap();
    assert!(!booted.boot.first_boot);
    assert!(booted.errors.is_empty(), "{:?}", booted.errors);
    assert_eq!(booted.tree, *h.engine.snapshot());
}

/// Dry-run shell whose `userdel` takes a while.
struct SlowUserdel(DryRunShell);

#[async_trait]
impl Shell for SlowUserdel {
    async fn output(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, ShellError> {
        if program == "userdel" {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        self.0.output(program, args, stdin).await
    }
}

#[tokio::test]
async fn test_abandoned_commit_still_finishes_save() {
    let dir = common::scratch_root();
    let system = SystemContext::new(
        SystemPaths::new(dir.path()),
        Arc::new(SlowUserdel(DryRunShell::new())),
    );
    let storage = ConfigStorage::new(dir.path().join("state"));
    let booted = bootstrap(&storage, None, &system).await.unwrap();
    let engine = ConfigEngine::new(booted.tree, system, storage, booted.boot);

    engine
        .commit::<LocalUsers, _>("operator", |users| {
            users.add_users(vec![User::new("bob", "x", Privilege::User)])
        })
        .await
        .unwrap();

    // The caller gives up while userdel is still running.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        engine.commit::<AaaConfig, _>("operator", |aaa| {
            aaa.radius.enabled = true;
            aaa.radius.servers = vec![server("10.0.0.1")];
            aaa.local_users.remove_users(&["bob".to_string()]);
            Ok(())
        }),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(engine.admission().holder().as_deref(), Some("operator"));

    for _ in 0..100 {
        if engine.admission().holder().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(engine.admission().holder(), None);

    let live = engine.snapshot();
    assert!(live.aaa.radius.enabled);
    assert!(live.aaa.local_users.find("bob").is_none());
    assert!(common::read(dir.path(), "etc/nsswitch.conf").contains("passwd: files radius"));
    assert_eq!(common::read(dir.path(), "etc/raddb/server"), "10.0.0.1:1812 testing123\n");
    assert!(!common::read(dir.path(), "etc/passwd").contains("bob:"));
}
