//! Version command

use anyhow::Result;

/// Run the version command.
///
/// # Errors
///
/// Infallible today; returns `Result` to match the other handlers.
pub fn run(json: bool) -> Result<()> {
    let package = env!("CARGO_PKG_VERSION");
    let build = outpost_common::BUILD_VERSION;

    if json {
        println!(
            "{}",
            serde_json::json!({ "version": package, "build": build })
        );
    } else {
        println!("outpost {package} (build {build})");
    }
    Ok(())
}
