use clap::Parser;
use psg_loader::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    match runtime.block_on(commands::run(args)) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("PSG Loader - Polysomnography Recording Reader");
    println!("=============================================");
    println!();
    println!("Decode EDF+ recordings and the companion files an analysis pipeline");
    println!("leaves next to them, aligned onto one timeline.");
    println!();
    println!("USAGE:");
    println!("    psg-loader <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    header      Decode and print a recording's header and channel table");
    println!("    load        Load a recording with every companion source and summarize it");
    println!("    stats       Load a recording and print its feature statistics table");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!("    -v, --verbose    Increase logging verbosity");
    println!("    -q, --quiet      Suppress progress output");
    println!();
    println!("Run 'psg-loader help <command>' for details on a specific command.");
}
