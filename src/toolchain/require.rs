//! Required executables check, run before any stage starts.

use std::path::Path;

use crate::build::BuildError;
use crate::config::SiteConfig;
use crate::utils::vars::resolve_args;
use rustc_hash::FxHashMap;

/// Package runners resolve their tool at run time; only the runner itself
/// is checked.
const PACKAGE_RUNNERS: [&str; 5] = ["npx", "bunx", "pnpx", "yarn", "dlx"];

/// Every external program this build will invoke, with its config field.
pub fn required_programs(
    config: &SiteConfig,
    vars: &FxHashMap<String, String>,
    has_ports: bool,
) -> Vec<(&'static str, String)> {
    let toolchain = &config.toolchain;
    let mut commands: Vec<(&'static str, &[String])> = vec![
        ("toolchain.compiler", &toolchain.compiler),
        ("toolchain.bundler", &toolchain.bundler),
        ("toolchain.codegen", &toolchain.codegen),
        ("toolchain.review", &toolchain.review),
        ("render.command", &config.render.command),
        ("adapter.command", &config.adapter.command),
    ];
    if !config.build.debug {
        commands.push(("toolchain.optimizer", &toolchain.optimizer));
    }
    if has_ports {
        commands.push(("toolchain.ports", &toolchain.ports));
    }

    commands
        .into_iter()
        .filter_map(|(field, command)| {
            let program = resolve_args(command.get(..1)?, vars).pop()?;
            Some((field, program))
        })
        .collect()
}

/// Fail on the first program that does not resolve on `PATH` (or, for
/// paths, relative to the project root).
pub fn require_executables(
    config: &SiteConfig,
    vars: &FxHashMap<String, String>,
    has_ports: bool,
) -> Result<(), BuildError> {
    for (field, program) in required_programs(config, vars, has_ports) {
        if !is_executable(&program, config.get_root()) {
            let hint = if PACKAGE_RUNNERS.contains(&program.as_str()) {
                "install a JavaScript package manager"
            } else {
                "install it, or run through a package script so PATH includes local binaries"
            };
            crate::log!("error"; "`{}` is required by {}: {}", program, field, hint);
            return Err(BuildError::MissingExecutable { program, field });
        }
    }
    Ok(())
}

fn is_executable(program: &str, root: &Path) -> bool {
    which::which_in(program, std::env::var_os("PATH"), root).is_ok()
}
