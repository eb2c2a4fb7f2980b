use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use pixwatch_core::platform::{create_platform, Platform};
use pixwatch_core::session::Session;
use pixwatch_core::{logger, settings::Settings};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let settings_path = arg_value(&args, "--settings")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join("settings.json"));
    let replay = arg_value(&args, "--replay").map(PathBuf::from);

    // Init logger
    logger::init(&cwd.join("logs"));
    logger::set_echo(args.iter().any(|a| a == "--echo"));

    let settings = Settings::load(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;
    let signatures = settings.signature_set()?;

    // Create platform (replaying a raw dump when given one)
    let platform = Arc::new(create_platform(replay.as_deref())?);

    let windows = platform.get_instances(&settings.window_pattern);
    let Some((window_id, title)) = windows.first().cloned() else {
        bail!("no window matches \"{}\"", settings.window_pattern);
    };
    logger::info(&format!("attaching to \"{}\" (id: {})", title, window_id));

    let mut session = Session::start(platform, window_id, &signatures, settings.session.clone())?;

    // Bad rules are reported and skipped; the rest still run.
    for parsed in settings.parse_rules() {
        match parsed {
            Ok(rule) if settings.is_enabled(&rule) => {
                session.start_rule(rule).ok();
            }
            Ok(rule) => logger::info(&format!("rule {} not enabled", rule.id)),
            Err(e) => logger::error(&format!("rule disabled: {}", e)),
        }
    }

    println!(
        "watching \"{}\" with {} rule(s): {}; type q to stop",
        title,
        session.running_rules().len(),
        session.running_rules().join(", ")
    );

    for line in io::stdin().lock().lines() {
        if line?.trim().eq_ignore_ascii_case("q") {
            break;
        }
    }

    session.stop();
    logger::info("pixwatch stopped");
    Ok(())
}
