use std::io::Read;

use stringy::cli::{self, CliArgs, VarsFile};
use stringy::config::Config;
use stringy::script::{parse_expression, parse_template, ErrorMode, Value};
use stringy::Stringy;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("stringy: {e}");
            eprintln!("Usage: stringy [-d] [-s] [-t] [-f[<file>]] [-Dname=value]... [-e<expr>] [<template>]");
            std::process::exit(1);
        }
    };

    init_logging(args.debug);

    if let Err(e) = run(args) {
        eprintln!("stringy: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `-d`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter),
        )
        .init();
}

fn run(args: CliArgs) -> Result<(), String> {
    // ── Load variables ────────────────────────────────────────────────────────
    let vars_path = match args.vars {
        VarsFile::Skip => None,
        VarsFile::Explicit(path) => Some(path),
        VarsFile::Search => cli::find_vars_file(),
    };

    let mut config = match &vars_path {
        Some(path) => {
            let (config, errors) = Config::load_file(path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            for e in &errors {
                eprintln!("stringy: warning: {}: {e}", path.display());
            }
            config
        }
        None => Config::new(),
    };

    for define in &args.defines {
        config
            .define(define)
            .map_err(|e| format!("-D{define}: {e}"))?;
    }

    let mode = if args.substitute {
        ErrorMode::SubstituteErrorText
    } else {
        ErrorMode::ThrowOnError
    };
    debug!(count = config.vars.len(), "variables bound");
    for (name, value) in config.vars.iter() {
        debug!(
            name,
            kind = config.vars.bound_type(name).unwrap_or("null"),
            %value,
            "variable"
        );
    }
    let mut engine = Stringy::with_symbols(config.vars);

    // ── Expression ────────────────────────────────────────────────────────────
    if let Some(expr) = args.expression {
        if args.tree {
            print!("{}", parse_expression(&expr).map_err(|e| e.to_string())?);
        } else {
            let value: Value = engine.evaluate(&expr, mode).map_err(|e| e.to_string())?;
            println!("{value}");
        }
        return Ok(());
    }

    // ── Template ──────────────────────────────────────────────────────────────
    let template = match args.template {
        Some(t) => t,
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .map_err(|e| format!("reading stdin: {e}"))?;
            s
        }
    };

    if args.tree {
        print!("{}", parse_template(&template).map_err(|e| e.to_string())?);
    } else {
        print!("{}", engine.execute(&template, mode).map_err(|e| e.to_string())?);
    }
    Ok(())
}
