#![warn(clippy::pedantic)]

pub mod preferences;
pub mod session;

use anyhow::Result as AnyResult;

fn main() -> AnyResult<()> {
    let preferences = preferences::Preferences::load();

    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(preferences.log_level.into())
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", preferences.log_level.into());
    }
    if preferences.did_fail_to_load() {
        log::warn!("Preferences weren't available, defaulting.");
        if let Err(e) = preferences.save_if_missing() {
            log::warn!("Failed to save default preferences:\n{e:?}");
        }
    }

    // Args are a simple list of session scripts, run one after another on fresh documents.
    let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: celpaint <session.toml>...");
    }
    let mut failures = 0usize;
    for path in &paths {
        let result: AnyResult<()> = try_block::try_block! {
            let script = session::Script::load(path)?;
            let mut session = session::Session::new(&script.sprite, &preferences.undo);
            let outcome = session.run(&script.ops);
            // Report what got done, even if it stopped partway.
            session.report();
            outcome
        };
        if let Err(e) = result {
            log::error!("Session {} failed: {e:#}", path.display());
            failures += 1;
        }
    }
    if failures != 0 {
        anyhow::bail!("{failures} of {} sessions failed", paths.len());
    }
    Ok(())
}
