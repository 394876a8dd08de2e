//! Bring the account database into agreement with a desired user list.

use std::collections::HashSet;

use crate::error::Error;
use crate::system::SystemContext;

use super::accounts::{self, AccountError, GroupEntry, PasswdEntry, ShadowEntry, PASSWD_SHADOW};
use super::user::{User, ADMIN_UID, DEFAULT_ADMIN, FIRST_USER_UID, RESERVED_RADIUS};

/// gid used when the default group cannot be found in the group file.
const FALLBACK_USERS_GID: u32 = 100;

fn persistence(e: impl std::fmt::Display) -> Error {
    Error::persistence(e.to_string())
}

/// Apply `desired` to the host. Stops at the first failure.
///
/// Every uid assigned or found is written back into `desired`.
pub async fn reconcile(desired: &mut [User], ctx: &SystemContext) -> Result<(), Error> {
    let paths = &ctx.paths;

    let passwd = accounts::read_lines(&paths.passwd())
        .map_err(|e| Error::persistence(format!("cannot enumerate local accounts: {}", e)))?;

    let wanted: HashSet<&str> = desired.iter().map(|u| u.username.as_str()).collect();
    for entry in passwd.iter().filter_map(|l| PasswdEntry::parse(l)) {
        if !entry.is_managed() && wanted.contains(entry.name.as_str()) {
            return Err(Error::persistence(format!(
                "cannot modify reserved account {}",
                entry.name
            )));
        }
    }

    let removed: Vec<String> = accounts::managed_entries(&passwd)
        .into_iter()
        .map(|e| e.name)
        .filter(|name| !wanted.contains(name.as_str()) && name != DEFAULT_ADMIN)
        .collect();
    for name in &removed {
        remove_account(name, ctx).await?;
    }

    // userdel may have rewritten the files; start again from what is on disk.
    let passwd = accounts::read_lines(&paths.passwd()).map_err(persistence)?;
    let shadow = accounts::read_lines(&paths.shadow()).map_err(persistence)?;
    let group = accounts::read_lines(&paths.group()).map_err(persistence)?;

    let removed: HashSet<&str> = removed.iter().map(String::as_str).collect();
    let users_gid = accounts::group_gid(&group, &ctx.accounts.default_group).unwrap_or(FALLBACK_USERS_GID);

    let mut known: HashSet<String> = HashSet::new();
    let mut managed: HashSet<String> = HashSet::new();
    let mut taken: HashSet<u32> = HashSet::new();
    let mut passwd_out = Vec::with_capacity(passwd.len() + desired.len());
    for line in passwd {
        match PasswdEntry::parse(&line) {
            Some(entry) if entry.is_managed() && removed.contains(entry.name.as_str()) => {
                managed.insert(entry.name);
            }
            Some(entry) => {
                if let Some(user) = desired.iter_mut().find(|u| u.username == entry.name) {
                    user.uid = Some(entry.uid);
                }
                if entry.is_managed() {
                    managed.insert(entry.name.clone());
                }
                taken.insert(entry.uid);
                known.insert(entry.name);
                passwd_out.push(line);
            }
            None => passwd_out.push(line),
        }
    }

    for user in desired.iter_mut().filter(|u| !known.contains(&u.username)) {
        let uid = if user.username == DEFAULT_ADMIN && !taken.contains(&ADMIN_UID) {
            ADMIN_UID
        } else {
            (FIRST_USER_UID..).find(|uid| !taken.contains(uid)).unwrap_or(FIRST_USER_UID)
        };
        taken.insert(uid);
        user.uid = Some(uid);
        managed.insert(user.username.clone());
        tracing::info!(user = %user.username, uid, "Creating local account");

        let entry = PasswdEntry {
            name: user.username.clone(),
            password: PASSWD_SHADOW.to_string(),
            uid,
            gid: users_gid,
            gecos: String::new(),
            home: ctx.accounts.home_dir.clone(),
            shell: ctx.accounts.login_shell.clone(),
        };
        passwd_out.push(entry.to_line());
    }

    let shadow_out = rewrite_shadow(shadow, desired, &removed);
    let group_out = rewrite_groups(group, desired, &managed, ctx)?;

    accounts::write_lines(&paths.passwd(), &passwd_out).map_err(persistence)?;
    accounts::write_lines(&paths.shadow(), &shadow_out).map_err(persistence)?;
    accounts::write_lines(&paths.group(), &group_out).map_err(persistence)?;
    Ok(())
}

async fn remove_account(name: &str, ctx: &SystemContext) -> Result<(), Error> {
    if name == RESERVED_RADIUS || name == DEFAULT_ADMIN {
        return Err(Error::persistence(format!("cannot delete reserved account {}", name)));
    }

    let processes = ctx.shell.output("pstree", &[name], None).await.map_err(persistence)?;
    if processes.success() && !processes.stdout.trim().is_empty() {
        return Err(Error::persistence(format!(
            "cannot delete {} because the user is logged in",
            name
        )));
    }

    tracing::info!(user = %name, "Removing local account");
    ctx.shell.run("userdel", &["-f", name], None).await.map_err(persistence)?;
    Ok(())
}

fn rewrite_shadow(lines: Vec<String>, desired: &[User], removed: &HashSet<&str>) -> Vec<String> {
    let mut written: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(lines.len() + desired.len());

    for line in lines {
        let Some(mut entry) = ShadowEntry::parse(&line) else {
            out.push(line);
            continue;
        };
        if removed.contains(entry.name.as_str()) {
            continue;
        }
        match desired.iter().find(|u| u.username == entry.name) {
            Some(user) => {
                written.insert(user.username.as_str());
                entry.hash = user.password.clone();
                out.push(entry.to_line());
            }
            None => out.push(line),
        }
    }

    for user in desired.iter().filter(|u| !written.contains(u.username.as_str())) {
        out.push(ShadowEntry::new(&user.username, &user.password).to_line());
    }
    out
}

/// Default group lists every managed account, admin group lists root and
/// the administrators. Members this engine does not manage are kept.
fn rewrite_groups(
    lines: Vec<String>,
    desired: &[User],
    managed: &HashSet<String>,
    ctx: &SystemContext,
) -> Result<Vec<String>, Error> {
    let default_group = &ctx.accounts.default_group;
    let admin_group = &ctx.accounts.admin_group;
    let mut seen_default = false;
    let mut seen_admin = false;
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        let Some(mut entry) = GroupEntry::parse(&line) else {
            out.push(line);
            continue;
        };
        let before = entry.members.clone();
        entry.members.retain(|m| !managed.contains(m));

        if entry.name == *default_group {
            seen_default = true;
            entry.members.extend(desired.iter().map(|u| u.username.clone()));
        } else if entry.name == *admin_group {
            seen_admin = true;
            entry.members.retain(|m| m != "root");
            entry.members.insert(0, "root".to_string());
            entry.members.extend(
                desired
                    .iter()
                    .filter(|u| u.is_admin() || u.is_default_admin())
                    .map(|u| u.username.clone()),
            );
        } else {
            // Other groups only lose members that no longer exist.
            entry.members = before
                .into_iter()
                .filter(|m| !managed.contains(m) || desired.iter().any(|u| u.username == *m))
                .collect();
        }
        out.push(entry.to_line());
    }

    for (seen, group) in [(seen_default, default_group), (seen_admin, admin_group)] {
        if !seen {
            return Err(persistence(AccountError::MissingGroup {
                file: ctx.paths.group(),
                group: group.clone(),
            }));
        }
    }
    Ok(out)
}
