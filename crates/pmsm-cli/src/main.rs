mod logger;

use std::env;
use std::path::{Path, PathBuf};

use log::{error, info};

use pmsm_api::http::HttpServerConfig;
use pmsm_api::schema::preview_rotor;
use pmsm_core::config::{debug_dump_config, ProjectConfig};
use pmsm_core::femm::FemmBackend;
use pmsm_core::result_store::ResultTable;
use pmsm_core::rotor::RotorKind;
use pmsm_core::study::{debug_dump_report, run_study};
use pmsm_core::sweep::{debug_dump_combos, expand};
use pmsm_core::sweep_json::spec_from_str;
use pmsm_core::{Params, Value};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"PMSM rotor sweep runner

USAGE:
    pmsm-cli <COMMAND> [OPTIONS]

COMMANDS:
    expand <SWEEP.json>             Print the combos of a JSON sweep as CSV
    preview <ROTOR> [KEY=VALUE]...  Build a rotor in memory, print primitives as JSON
    run <PROJECT.json>              Run the queued simulations of a project
    serve                           Start the HTTP API

OPTIONS:
    -h, --help              Print help information
    -V, --version           Print version information
    -o, --out <PATH>        Write output to a file instead of stdout
    --json                  expand: print JSON instead of CSV
    --only <NAME>           run: only the named simulation
    --bind <ADDR>           serve: bind address (default: 127.0.0.1:8080)

ROTORS:
    surface, buried, spoke, vshape, ithma, halbach

EXAMPLES:
    pmsm-cli expand sweep.json
    pmsm-cli preview vshape magnet_depth=2 magnet_angle=20 -o v.json
    pmsm-cli run project.json --only spm
    pmsm-cli serve --bind 0.0.0.0:8080

Set PMSM_LOG=warn|info|debug to change log verbosity."#
    );
}

fn print_version() {
    println!("pmsm {}", VERSION);
}

fn main() {
    logger::init(logger::level_from_env());

    let mut args = env::args().skip(1);
    let mut command: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut out_path: Option<PathBuf> = None;
    let mut json = false;
    let mut only: Option<String> = None;
    let mut bind_addr = "127.0.0.1:8080".to_string();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                print_version();
                std::process::exit(0);
            }
            "--out" | "-o" => {
                let Some(path) = args.next() else {
                    eprintln!("missing value for {}", arg);
                    std::process::exit(2);
                };
                out_path = Some(PathBuf::from(path));
            }
            "--json" => json = true,
            "--only" => {
                let Some(value) = args.next() else {
                    eprintln!("missing value for {}", arg);
                    std::process::exit(2);
                };
                only = Some(value);
            }
            "--bind" => {
                let Some(value) = args.next() else {
                    eprintln!("missing value for {}", arg);
                    std::process::exit(2);
                };
                bind_addr = value;
            }
            _ => {
                if command.is_none() {
                    command = Some(arg);
                } else {
                    positional.push(arg);
                }
            }
        }
    }

    let Some(command) = command else {
        eprintln!("usage: pmsm-cli <expand|preview|run|serve> [options]");
        std::process::exit(2);
    };

    let result = match command.as_str() {
        "expand" => cmd_expand(&positional, json, out_path.as_deref()),
        "preview" => cmd_preview(&positional, out_path.as_deref()),
        "run" => cmd_run(&positional, only.as_deref()),
        "serve" => cmd_serve(bind_addr),
        other => {
            eprintln!("unknown command: {}", other);
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn cmd_expand(positional: &[String], json: bool, out: Option<&Path>) -> Result<(), String> {
    let Some(path) = positional.first() else {
        eprintln!("usage: pmsm-cli expand <sweep.json>");
        std::process::exit(2);
    };
    let raw = std::fs::read_to_string(path).map_err(|err| format!("failed to read {}: {}", path, err))?;
    let spec = spec_from_str(&raw).map_err(|err| err.to_string())?;
    let combos = expand(&spec).map_err(|err| err.to_string())?;
    info!("{} combos", combos.len());
    if out.is_some() {
        debug_dump_combos(&combos);
    }

    let text = if json {
        serde_json::to_string_pretty(&combos).map_err(|err| err.to_string())?
    } else {
        ResultTable::from_rows(combos).to_csv_string()
    };
    emit(&text, out)
}

fn cmd_preview(positional: &[String], out: Option<&Path>) -> Result<(), String> {
    let Some((rotor, assignments)) = positional.split_first() else {
        eprintln!("usage: pmsm-cli preview <rotor> [key=value]...");
        std::process::exit(2);
    };
    let kind = RotorKind::parse(rotor).ok_or_else(|| format!("unknown rotor '{}'", rotor))?;
    let mut params = Params::new();
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)
            .ok_or_else(|| format!("expected key=value, got '{}'", assignment))?;
        params.insert(key, value);
    }
    let preview = preview_rotor(kind, &params).map_err(|err| err.to_string())?;
    let text = serde_json::to_string_pretty(&preview).map_err(|err| err.to_string())?;
    emit(&text, out)
}

fn cmd_run(positional: &[String], only: Option<&str>) -> Result<(), String> {
    let Some(path) = positional.first() else {
        eprintln!("usage: pmsm-cli run <project.json>");
        std::process::exit(2);
    };
    let project = ProjectConfig::load(Path::new(path)).map_err(|err| err.to_string())?;
    debug_dump_config(&project);
    if let Some(name) = only {
        if !project.simulations.iter().any(|sim| sim.name == name) {
            return Err(format!("no simulation named '{}'", name));
        }
    }

    let backend = FemmBackend::new(project.femm.clone());
    let mut failed = 0usize;
    for sim in &project.simulations {
        if only.is_some_and(|name| name != sim.name) {
            continue;
        }
        info!("running {} ({:?}, {})", sim.name, sim.study, sim.rotor.name());
        match run_study(&backend, &project, sim) {
            Ok(report) => {
                debug_dump_report(&sim.name, &report);
                let report_path = project
                    .results_dir(&sim.name)
                    .join(format!("{}_report.json", sim.name));
                let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
                write_file(&report_path, &text)?;
                println!("report written: {}", report_path.display());
            }
            Err(err) => {
                error!("simulation {} failed: {}", sim.name, err);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{} simulation(s) failed", failed));
    }
    Ok(())
}

fn cmd_serve(bind_addr: String) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|err| err.to_string())?;
    runtime.block_on(pmsm_api::http::run(HttpServerConfig { bind_addr }))
}

/// `key=value`; the value is read as a number, then a bool, then text.
fn parse_assignment(raw: &str) -> Option<(&str, Value)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let parsed = if let Ok(v) = value.parse::<i64>() {
        Value::Int(v)
    } else if let Ok(v) = value.parse::<f64>() {
        Value::Float(v)
    } else if let Ok(v) = value.parse::<bool>() {
        Value::Bool(v)
    } else {
        Value::from(value)
    };
    Some((key, parsed))
}

fn emit(text: &str, out: Option<&Path>) -> Result<(), String> {
    match out {
        Some(path) => {
            write_file(path, text)?;
            println!("written: {}", path.display());
            Ok(())
        }
        None => {
            println!("{}", text.trim_end());
            Ok(())
        }
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    std::fs::write(path, text).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}
