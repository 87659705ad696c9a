//! Handler for the `shell` command.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::command::ShellArgs;
use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, RegistryMode};
use crate::infrastructure::config::settings::Settings;

/// Execute the shell command and return the shell's exit code.
///
/// The session is not tracked: it never appears in `list` and is not
/// registered.
pub async fn execute(settings: &Settings, state_dir: &Path, args: &ShellArgs) -> Result<i32> {
    let lifecycle = bootstrap::build_lifecycle(settings, state_dir, RegistryMode::Disabled)?;
    let session = lifecycle.prepare_shell(args.image.image.as_deref()).await?;

    if output::is_json() {
        output::json_output(&json!({
            "command": "shell",
            "image": session.spec.image,
            "port": session.port,
            "api_key": session.credential.expose(),
        }));
    } else {
        output::field("Image", &session.spec.image);
        output::field("Port", session.port);
        output::field("API key", session.credential.expose());
        output::hint("PORT and API_KEY are exported inside the shell");
    }

    lifecycle.run_shell(&session).await
}
