use std::{
    io::{self, Write},
    process::ExitCode,
};

use karst::Session;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        // File execution mode: one expression per non-empty line.
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Error reading {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        let mut session = Session::new();
        for line in source.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match session.run(line) {
                Ok(printed) => println!("{printed}"),
                Err(err) => {
                    eprintln!("{err}");
                    return ExitCode::FAILURE;
                }
            }
        }
        return ExitCode::SUCCESS;
    }

    // Interactive mode.
    let mut session = Session::new();
    loop {
        let Some(line) = read_line(">>> ") else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match session.run(&line) {
            Ok(printed) => println!("{printed}"),
            Err(err) => eprintln!("{err}"),
        }
    }

    ExitCode::SUCCESS
}

/// Prompts and reads one line, or `None` on end of input.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_owned()),
        Err(_) => None,
    }
}
