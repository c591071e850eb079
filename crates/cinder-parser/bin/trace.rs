use std::str::FromStr;

use anyhow::Context;
use cinder_parser::{language, parse_with, ParseOptions};
use cinder_runtime::TraceLog;

fn main() -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_owned());
    let level = log::LevelFilter::from_str(&level).context("Invalid RUST_LOG level")?;

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )?;

    let mut print_grammar = false;
    let mut print_failed = false;
    let mut file = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--grammar" => print_grammar = true,
            "--failed" => print_failed = true,
            _ => file = Some(arg),
        }
    }

    if print_grammar {
        print!("{}", language().display());
        println!();
    }

    let Some(file) = file else {
        anyhow::ensure!(print_grammar, "No filename provided");
        return Ok(());
    };
    let contents =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read `{file}`"))?;

    let mut trace = TraceLog::new();
    let result = parse_with(
        &contents,
        ParseOptions {
            tracer: Some(&mut trace),
            ..Default::default()
        },
    );

    print!("{}", trace.display(print_failed));
    println!();
    match result {
        Ok(program) => println!("{program:#?}"),
        Err(failure) => println!("{}", failure.render(&contents)),
    }

    Ok(())
}
