use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use kscope::{Backend, Form, Session, TextBackend};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Source file; reads standard input when omitted.
    input: Option<PathBuf>,

    /// Print the accumulated module after all forms are processed.
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut session = Session::new(TextBackend::new("kscope"));
    let mut failed = false;

    for result in session.run(&source) {
        match result {
            Ok(Form::Definition(ir)) => println!("read function definition:\n{}", ir),
            Ok(Form::Extern(ir)) => println!("read extern:\n{}", ir),
            Ok(Form::Expression(ir)) => println!("read top-level expression:\n{}", ir),
            Err(err) => {
                eprintln!("error: {}", err);
                failed = true;
            }
        }
    }

    if cli.dump {
        println!("{}", session.backend().print_module());
    }

    if failed {
        bail!("one or more top-level forms failed");
    }

    Ok(())
}
