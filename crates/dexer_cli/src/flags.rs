//! `dexer flags`: print the derived tool flags and the files they read.

use dexer_core::{BuildEnv, FlagSet, PlatformSdk};

use crate::pipeline::plan_module;
use crate::{GlobalArgs, ModuleArgs};

/// Runs the `dexer flags` command.
///
/// Prints one flag per line, then one dependency per line. Returns exit code
/// 1 if any diagnostic is an error.
pub fn run(args: &ModuleArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let lookup = |key: &str| std::env::var(key).ok();
    let env = BuildEnv::from_lookup(lookup);
    let sdk = PlatformSdk::from_lookup(lookup);
    let outcome = plan_module(args, global, &env, &sdk)?;

    if let Some(plan) = &outcome.plan {
        if !global.quiet {
            eprintln!("   Selected {}", plan.selection.pipeline);
        }
        print!("{}", render(&plan.flags));
    }
    Ok(outcome.exit_code())
}

fn render(flags: &FlagSet) -> String {
    let mut out = String::from("# flags\n");
    for flag in &flags.flags {
        out.push_str(flag);
        out.push('\n');
    }
    out.push_str("# deps\n");
    for dep in &flags.deps {
        out.push_str(dep.as_str());
        out.push('\n');
    }
    out
}
