//! `dexer plan`: print a module's dex actions.

use dexer_core::{BuildEnv, DexPlan, NinjaWriter, PlatformSdk};
use serde_json::json;

use crate::pipeline::{plan_module, PlanOutcome};
use crate::{GlobalArgs, OutputFormat, PlanArgs};

/// Runs the `dexer plan` command.
///
/// Returns exit code 0 on success, 1 if any diagnostic is an error.
pub fn run(args: &PlanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let lookup = |key: &str| std::env::var(key).ok();
    let env = BuildEnv::from_lookup(lookup);
    let sdk = PlatformSdk::from_lookup(lookup);
    let outcome = plan_module(&args.module, global, &env, &sdk)?;

    match args.format {
        OutputFormat::Json => println!("{}", render_json(&outcome)?),
        OutputFormat::Ninja => {
            if let Some(plan) = &outcome.plan {
                print!("{}", render_ninja(plan)?);
            }
        }
    }

    Ok(outcome.exit_code())
}

/// Renders the outcome as one JSON document, fingerprints included.
fn render_json(outcome: &PlanOutcome) -> Result<String, serde_json::Error> {
    let plan = match &outcome.plan {
        Some(plan) => {
            let mut actions = Vec::with_capacity(plan.actions.len());
            for action in &plan.actions {
                let mut value = serde_json::to_value(action)?;
                value["fingerprint"] = json!(action.fingerprint().to_string());
                actions.push(value);
            }
            json!({
                "pipeline": plan.selection.pipeline,
                "remote": plan.selection.remote,
                "javalib_jar": plan.javalib_jar,
                "proguard_dictionary": plan.proguard_dictionary,
                "proguard_usage_zip": plan.proguard_usage_zip,
                "flags": plan.flags,
                "actions": actions,
            })
        }
        None => serde_json::Value::Null,
    };
    serde_json::to_string_pretty(&json!({
        "module": outcome.module,
        "plan": plan,
        "diagnostics": outcome.diagnostics,
    }))
}

fn render_ninja(plan: &DexPlan) -> Result<String, Box<dyn std::error::Error>> {
    let mut writer = NinjaWriter::new();
    writer.write_graph(&plan.graph()?)?;
    Ok(writer.finish())
}
