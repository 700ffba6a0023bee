//! Edict CLI entry point.

use std::env;
use std::process::ExitCode;

use edict_runtime::{Bootstrap, CliConfig, Runtime, RuntimeError};

fn main() -> ExitCode {
    match run(env::args()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn run(args: env::Args) -> Result<ExitCode, RuntimeError> {
    let args: Vec<String> = args.collect();
    let Some(boot) = Bootstrap::from_args(args.clone())? else {
        let config = CliConfig::parse(args)?;
        if config.show_help {
            print_help();
        } else {
            println!("edict {}", env!("CARGO_PKG_VERSION"));
        }
        return Ok(ExitCode::SUCCESS);
    };

    tracing_subscriber::fmt()
        .with_max_level(boot.config.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut runtime = Runtime::new(&boot.config)?;
    let outcome = runtime.run(&boot.source)?;

    for value in &outcome.stack {
        println!("{}", value.text_lossy());
    }

    if outcome.is_throwing() {
        for exception in &outcome.exceptions {
            eprintln!("\x1b[31m{}: uncaught exception: {}\x1b[0m", boot.name, exception.text_lossy());
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!(
        "\x1b[1mEdict\x1b[0m - Concatenative list/tree interpreter

\x1b[1mUSAGE:\x1b[0m
    edict [OPTIONS] <SCRIPT>
    edict [OPTIONS] -e <TEXT>

\x1b[1mARGUMENTS:\x1b[0m
    <SCRIPT>           Script file to run

\x1b[1mOPTIONS:\x1b[0m
    -e, --eval TEXT    Run TEXT instead of a file
    -h, --help         Print help information
    -V, --version      Print version information

\x1b[1mDEBUG OPTIONS:\x1b[0m
    --trace            Log exceptions, skipped regions and continuations
    --trace-vm         Log every dispatched instruction

\x1b[1mNATIVES:\x1b[0m
    print  dump  copy  add  sub  eq

\x1b[1mEXAMPLES:\x1b[0m
    edict -e \"[2] [3] add ! print !\"
    edict --trace counter.ed"
    );
}
