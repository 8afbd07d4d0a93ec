use std::process;

use clap::Parser;

use vervet::cli::Cli;
use vervet::printer::Printer;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let printer = Printer::new();

    if let Err(err) = cli.run(&printer) {
        printer.fatal(&err.to_string());
        process::exit(1);
    }
}
