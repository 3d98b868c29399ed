//! Apply-script rendering — a pure function from a fixed template and a
//! validated parameter record to script text.
//!
//! Version strings reach the template only as [`EmbeddableVersion`], so an
//! unvalidated tag from the release feed cannot be rendered at all. Paths
//! and names come from local configuration and are shell-quoted.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use outpost_common::ChatRef;

use crate::domain::error::ValidationError;
use crate::domain::release::{STAGED_BINARY_DIR, STAGED_FILES_DIR};
use crate::domain::version::EmbeddableVersion;

const APPLY_TEMPLATE: &str = r#"#!/usr/bin/env bash
# Generated by outpost before each update. Do not edit.
set -euo pipefail

OLD_VERSION="{{OLD_VERSION}}"
NEW_VERSION="{{NEW_VERSION}}"
CHAT_REF="{{CHAT_REF}}"
STAGING_DIR={{STAGING_DIR}}
INSTALL_DIR={{INSTALL_DIR}}
BINARY_NAME={{BINARY_NAME}}
SERVICE_NAME={{SERVICE_NAME}}
LOCK_FILE={{LOCK_FILE}}

log() { printf '[%s] %s\n' "$(date -u +%Y-%m-%dT%H:%M:%SZ)" "$*"; }

# Own the lock from here on: liveness checks must follow this process,
# not the agent it is about to stop.
echo "$$" > "$LOCK_FILE"
trap 'status=$?; [ "$status" -eq 0 ] || log "apply failed with status $status"; rm -f "$LOCK_FILE"' EXIT

log "applying $OLD_VERSION -> $NEW_VERSION (requested from chat $CHAT_REF)"
sleep 2

systemctl stop "$SERVICE_NAME" || log "service $SERVICE_NAME was not running"

mkdir -p "$INSTALL_DIR"
install -m 0755 "$STAGING_DIR/{{BIN_DIR}}/$BINARY_NAME" "$INSTALL_DIR/$BINARY_NAME"
if [ -d "$STAGING_DIR/{{FILES_DIR}}" ]; then
    cp -R "$STAGING_DIR/{{FILES_DIR}}/." "$INSTALL_DIR/"
fi

systemctl start "$SERVICE_NAME"
rm -rf "$STAGING_DIR"
log "update to $NEW_VERSION applied"
"#;

/// Local filesystem layout the apply script operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLayout {
    pub staging_dir: PathBuf,
    pub install_dir: PathBuf,
    pub binary_name: String,
    pub service_name: String,
    pub lock_path: PathBuf,
}

/// Everything the template needs, with both versions already proven safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptParams {
    pub chat_ref: ChatRef,
    pub old_version: EmbeddableVersion,
    pub new_version: EmbeddableVersion,
    pub layout: ScriptLayout,
}

impl ScriptParams {
    /// # Errors
    ///
    /// Returns [`ValidationError`] if either version fails the embedding gate.
    pub fn new(
        chat_ref: ChatRef,
        old_version: &str,
        new_version: &str,
        layout: ScriptLayout,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            chat_ref,
            old_version: EmbeddableVersion::new(old_version)?,
            new_version: EmbeddableVersion::new(new_version)?,
            layout,
        })
    }
}

/// Renders the apply script.
#[must_use]
pub fn render_apply_script(params: &ScriptParams) -> String {
    let layout = &params.layout;
    let chat_ref = params.chat_ref.to_string();
    let values = [
        ("OLD_VERSION", Cow::Borrowed(params.old_version.as_str())),
        ("NEW_VERSION", Cow::Borrowed(params.new_version.as_str())),
        ("CHAT_REF", Cow::Borrowed(chat_ref.as_str())),
        ("STAGING_DIR", quote_path(&layout.staging_dir)),
        ("INSTALL_DIR", quote_path(&layout.install_dir)),
        ("BINARY_NAME", quote(&layout.binary_name)),
        ("SERVICE_NAME", quote(&layout.service_name)),
        ("LOCK_FILE", quote_path(&layout.lock_path)),
        ("BIN_DIR", Cow::Borrowed(STAGED_BINARY_DIR)),
        ("FILES_DIR", Cow::Borrowed(STAGED_FILES_DIR)),
    ];
    fill_template(APPLY_TEMPLATE, &values)
}

/// Single pass over the template so substituted values are never rescanned.
fn fill_template(template: &str, values: &[(&str, Cow<'_, str>)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn quote(s: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(s))
}

fn quote_path(path: &Path) -> Cow<'_, str> {
    shell_escape::unix::escape(path.to_string_lossy())
}
