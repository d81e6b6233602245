//! `$PAGESMITH_*` variables for external tool commands.
//!
//! Toolchain and adapter command vectors in `pagesmith.toml` may reference
//! build locations, e.g. `["vite", "build", "--outDir", "$PAGESMITH_OUTPUT_DIR"]`.
//! The same map is exported to the subprocess environment.

use rustc_hash::FxHashMap;

use crate::config::SiteConfig;

/// Build `$PAGESMITH_*` variables for tool execution
pub fn build_vars(config: &SiteConfig) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();

    vars.insert("PAGESMITH_ROOT".into(), config.get_root().display().to_string());
    vars.insert(
        "PAGESMITH_OUTPUT_DIR".into(),
        config.build.output.display().to_string(),
    );
    vars.insert(
        "PAGESMITH_WORK_DIR".into(),
        config.build.work_dir.display().to_string(),
    );
    vars.insert("PAGESMITH_BASE".into(), config.build.base.clone());
    vars.insert(
        "PAGESMITH_SHELL".into(),
        config.paths().shell_entry().display().to_string(),
    );
    vars.insert(
        "PAGESMITH_RENDER_MODULE".into(),
        config.paths().render_module().display().to_string(),
    );
    vars.insert(
        "PAGESMITH_PORTS_OUTPUT".into(),
        config.paths().ports_output().display().to_string(),
    );

    let mode = if config.build.debug { "debug" } else { "optimize" };
    vars.insert("PAGESMITH_MODE".into(), mode.into());

    vars
}

/// Resolve `$PAGESMITH_*` variables in command arguments
///
/// Longer keys are substituted first so `$PAGESMITH_ROOT_X` never gets
/// clobbered by a shorter `$PAGESMITH_ROOT`.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                let pattern = format!("${}", key);
                result = result.replace(&pattern, &vars[key.as_str()]);
            }
            result
        })
        .collect()
}
