//! compose – command-line content-tree → PDF builder.
//!
//! Usage:
//!   compose <input.json> [output.pdf]
//!   compose --sample [output.pdf]
//!
//! The input is a JSON document configuration (see the `content` module);
//! binary payloads travel as base64 data URIs. `--sample` builds the
//! built-in report template instead of reading a file.

use std::{env, fs, path::PathBuf, process};

use pdf_compose::{build, build_from_json, templates};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut sample = false;
    let mut positional = 0usize;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--sample" | "-s" => sample = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    // With --sample the single positional argument is the output path.
    if sample && output_path.is_none() {
        output_path = input_path.take();
    }

    let result = if sample {
        build(&templates::report())
    } else {
        let input = match &input_path {
            Some(p) => p.clone(),
            None => {
                eprintln!("Error: no input file specified.");
                print_usage(&args[0]);
                process::exit(1);
            }
        };
        let json = match fs::read_to_string(&input) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", input.display());
                process::exit(1);
            }
        };
        build_from_json(&json)
    };

    // Default output: same directory + same stem as input, with .pdf
    let output = output_path.unwrap_or_else(|| {
        input_path
            .map(|mut p| {
                p.set_extension("pdf");
                p
            })
            .unwrap_or_else(|| PathBuf::from("sample.pdf"))
    });

    match result {
        Ok(document) => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        eprintln!("Error creating output directory: {e}");
                        process::exit(1);
                    }
                }
            }
            if let Err(e) = fs::write(&output, document.as_bytes()) {
                eprintln!("Error writing '{}': {e}", output.display());
                process::exit(1);
            }
            let pages = document.page_count();
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                output.display(),
                document.len(),
                pages,
                if pages == 1 { "" } else { "s" }
            );
        }
        Err(e) => {
            eprintln!("Error building document: {e}");
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("compose – content-tree to PDF builder (pdf-compose)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <input.json> [output.pdf]");
    eprintln!("  {prog} --sample [output.pdf]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <input.json>   JSON document configuration (binary payloads as data URIs)");
    eprintln!("  [output.pdf]   Output path  (default: same stem as input with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --sample, -s   Build the built-in sample report instead of reading a file");
    eprintln!("  --help         Print this message");
}
