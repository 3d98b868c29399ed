//! Apply-script writer and launcher — implements `ScriptLauncher`.

use std::path::PathBuf;
use std::sync::Arc;

use outpost_common::{AgentConfig, ChatRef};
use tracing::info;

use crate::application::ports::{DetachedCommand, ProcessSpawner, ScriptLauncher};
use crate::domain::LaunchError;
use crate::domain::script::{ScriptLayout, ScriptParams, render_apply_script};
use crate::infra::fs::atomic_write;

pub struct ShellScriptLauncher {
    script_path: PathBuf,
    log_path: PathBuf,
    /// Optional prefix such as `systemd-run --scope --quiet`.
    wrapper: Vec<String>,
    layout: ScriptLayout,
    spawner: Arc<dyn ProcessSpawner>,
}

impl ShellScriptLauncher {
    #[must_use]
    pub fn new(
        script_path: PathBuf,
        log_path: PathBuf,
        wrapper: Vec<String>,
        layout: ScriptLayout,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            script_path,
            log_path,
            wrapper,
            layout,
            spawner,
        }
    }

    #[must_use]
    pub fn from_config(config: &AgentConfig, spawner: Arc<dyn ProcessSpawner>) -> Self {
        let layout = ScriptLayout {
            staging_dir: config.staging_path(),
            install_dir: config.install_dir.clone(),
            binary_name: config.binary_name.clone(),
            service_name: config.service_name.clone(),
            lock_path: config.lock_path(),
        };
        Self::new(
            config.script_path(),
            config.update_log_path(),
            config.launch_wrapper(),
            layout,
            spawner,
        )
    }

    fn command(&self) -> DetachedCommand {
        let script = self.script_path.to_string_lossy().into_owned();
        match self.wrapper.split_first() {
            Some((program, rest)) => {
                let mut args = rest.to_vec();
                args.push("/bin/bash".to_string());
                args.push(script);
                DetachedCommand {
                    program: PathBuf::from(program),
                    args,
                    log_path: self.log_path.clone(),
                }
            }
            None => DetachedCommand {
                program: PathBuf::from("/bin/bash"),
                args: vec![script],
                log_path: self.log_path.clone(),
            },
        }
    }
}

impl ScriptLauncher for ShellScriptLauncher {
    fn compose_and_launch(
        &self,
        chat_ref: ChatRef,
        old_version: &str,
        new_version: &str,
    ) -> Result<(), LaunchError> {
        // Validation happens before anything touches the disk.
        let params = ScriptParams::new(chat_ref, old_version, new_version, self.layout.clone())?;
        let script = render_apply_script(&params);

        atomic_write(&self.script_path, script.as_bytes(), 0o755).map_err(|e| {
            LaunchError::Write {
                path: self.script_path.clone(),
                source: std::io::Error::other(format!("{e:#}")),
            }
        })?;

        let pid = self.spawner.spawn_detached(&self.command())?;
        info!(pid, script = %self.script_path.display(), "apply script launched");
        Ok(())
    }
}
