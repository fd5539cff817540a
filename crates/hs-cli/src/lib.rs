use std::ffi::OsString;
use std::fs;
use std::path::Path;

use clap::Parser;
use hs_api::{create_runtime, CreateRuntimeOptions, InvocationReport, ScanReport};
use hs_core::{ErrorDescriptor, Value};
use hs_tool::{assert_case, collect_case_files};
use log::info;
use serde::Serialize;

mod cli_args;
mod error_map;

pub(crate) use cli_args::{CaseArgs, Cli, ExecArgs, Mode};
pub(crate) use error_map::{
    emit_error, map_cli_async_runtime, map_cli_case, map_cli_config_read, map_cli_detail,
    map_cli_output, map_cli_source_read,
};

#[derive(Debug, Serialize)]
pub(crate) struct ExecOutput {
    scan: ScanReport,
    invocations: Vec<InvocationReport>,
    markup: String,
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ErrorDescriptor> {
    match cli.command {
        Mode::Exec(args) => run_exec(args),
        Mode::Case(args) => run_case(args),
    }
}

fn run_exec(args: ExecArgs) -> Result<i32, ErrorDescriptor> {
    let output = execute(&args)?;
    println!("RESULT:OK");
    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(map_cli_output)?
    );
    Ok(0)
}

/// Splits `<selector>:<event>` at the last colon.
pub(crate) fn parse_trigger(raw: &str) -> Result<(String, String), ErrorDescriptor> {
    match raw.rsplit_once(':') {
        Some((selector, event)) if !selector.trim().is_empty() && !event.trim().is_empty() => {
            Ok((selector.trim().to_string(), event.trim().to_string()))
        }
        _ => Err(ErrorDescriptor::invalid_argument(
            "CLI_TRIGGER_INVALID",
            format!("Cannot read trigger '{}'.", raw),
        )
        .suggest("Use <selector>:<event>, for example '#save:click'.")),
    }
}

pub(crate) fn execute(args: &ExecArgs) -> Result<ExecOutput, ErrorDescriptor> {
    let markup = fs::read_to_string(&args.markup).map_err(map_cli_source_read)?;
    let options_json = match &args.config {
        Some(path) => Some(fs::read_to_string(path).map_err(map_cli_config_read)?),
        None => None,
    };
    let triggers = args
        .triggers
        .iter()
        .map(|raw| parse_trigger(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let detail = match &args.detail {
        Some(raw) => Value::from_json(&serde_json::from_str(raw).map_err(map_cli_detail)?),
        None => Value::Null,
    };

    let runtime = create_runtime(CreateRuntimeOptions {
        markup,
        options: None,
        options_json,
    })?;
    let async_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(map_cli_async_runtime)?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&async_runtime, async {
        let scan = runtime.scan().await;
        info!("installed {} behaviour(s)", scan.installed.len());
        let mut invocations = Vec::new();
        for (selector, event) in &triggers {
            let target = runtime.select(selector)?;
            invocations.extend(runtime.trigger(target, event, detail.clone()).await);
        }
        if let Some(source) = &args.run {
            let me = match &args.on {
                Some(selector) => Some(runtime.select(selector)?),
                None => None,
            };
            invocations.extend(runtime.run(me, source).await?);
        }
        Ok::<_, ErrorDescriptor>(ExecOutput {
            scan,
            invocations,
            markup: runtime.dom().read(|doc| doc.to_markup()),
        })
    })
}

fn run_case(args: CaseArgs) -> Result<i32, ErrorDescriptor> {
    let files = collect_case_files(Path::new(&args.path)).map_err(map_cli_case)?;
    let mut failed = 0usize;
    for path in &files {
        match assert_case(path) {
            Ok(report) => println!(
                "PASS {} ({} invocation(s))",
                path.display(),
                report.invocations.len()
            ),
            Err(error) => {
                failed += 1;
                println!("FAIL {}: {}", path.display(), error);
            }
        }
    }
    println!("RESULT:{}", if failed == 0 { "OK" } else { "FAILED" });
    println!("CASES:{} FAILED:{}", files.len(), failed);
    Ok(if failed == 0 { 0 } else { 1 })
}

#[cfg(test)]
mod tests;
