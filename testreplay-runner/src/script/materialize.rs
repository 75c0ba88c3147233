// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ScriptDialect;
use crate::{errors::MaterializeError, identity::TestIdentity};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use std::io::Write;
use tracing::debug;

/// The generator name written into the header comment of every script.
pub const GENERATOR_NAME: &str = "testreplay";

/// Renders a replay script that runs `command` over `identities`.
///
/// Identities are emitted in the given order, repeats included. The script's
/// own arguments are forwarded to `command` ahead of the identities.
///
/// Identities are not checked with [`ScriptDialect::find_unrepresentable`];
/// [`materialize`] does that before rendering.
pub fn render_script(
    identities: &[TestIdentity],
    command: &str,
    dialect: &dyn ScriptDialect,
) -> String {
    let continuation = dialect.continuation();
    let mut out = format!(
        "{} generated by {GENERATOR_NAME}\n{command} {}",
        dialect.comment_prefix(),
        dialect.args_passthrough(),
    );
    for test in identities {
        out.push(' ');
        out.push_str(continuation);
        out.push_str("\n  ");
        out.push_str(&dialect.quote(test.as_str()));
    }
    out
}

/// Writes a replay script for `identities` to `target_path`.
///
/// The previous script at `target_path`, if any, is replaced atomically: a
/// reader sees either the old script or the new one, never a partial file.
///
/// Fails without touching `target_path` if any identity contains a character
/// the dialect can't represent.
pub fn materialize(
    identities: &[TestIdentity],
    target_path: &Utf8Path,
    command: &str,
    dialect: &dyn ScriptDialect,
) -> Result<(), MaterializeError> {
    for test in identities {
        if let Some(ch) = dialect.find_unrepresentable(test.as_str()) {
            return Err(MaterializeError::Unrepresentable {
                test: test.to_string(),
                dialect: dialect.name(),
                ch,
            });
        }
    }

    if let Some(parent) = target_path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
    {
        std::fs::create_dir_all(parent).map_err(|error| MaterializeError::DirCreate {
            dir: parent.to_owned(),
            error,
        })?;
    }

    let contents = render_script(identities, command, dialect);
    AtomicFile::new(target_path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(contents.as_bytes()))
        .map_err(|error| MaterializeError::Write {
            path: target_path.to_owned(),
            error,
        })?;

    set_executable(target_path)?;

    debug!(
        "wrote {} replay script with {} tests to {target_path}",
        dialect.name(),
        identities.len(),
    );
    Ok(())
}

fn set_executable(path: &Utf8Path) -> Result<(), MaterializeError> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(
                |error| MaterializeError::SetPermissions {
                    path: path.to_owned(),
                    error,
                },
            )
        } else {
            // Batch files are executable by extension.
            let _ = path;
            Ok(())
        }
    }
}
