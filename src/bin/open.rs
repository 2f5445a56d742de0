#![cfg_attr(test, allow(dead_code))]

use std::env;
use std::fs::File;
use std::io::{self, Read, Write};
use std::process;

use tinydom::{Document, Error};

fn pretty_error(xml: &str, error: &Error) -> String {
    let context: String = match error.offset() {
        Some(offset) => xml.strip_prefix('\u{FEFF}').unwrap_or(xml)
            .get(offset..)
            .unwrap_or_default()
            .chars()
            .take(15)
            .collect(),
        None => String::new(),
    };

    if context.is_empty() {
        error.to_string()
    } else {
        format!("{} near {:?}", error, context)
    }
}

fn process_input<R>(input: R, compact: bool) -> Result<(), String>
    where R: Read
{
    let mut input = input;
    let mut data = String::new();

    if let Err(x) = input.read_to_string(&mut data) {
        return Err(format!("Can't read: {}", x));
    }

    let mut doc = Document::new();
    if let Err(e) = doc.parse(&data) {
        return Err(format!("Unable to parse: {}", pretty_error(&data, &e)));
    }

    let out = io::stdout();
    let mut out = doc.write_to(out.lock(), compact).map_err(|e| format!("I can't output: {}", e))?;
    out.flush().map_err(|e| format!("I can't output: {}", e))
}

fn main() {
    let mut compact = false;
    let mut filename = None;

    for arg in env::args().skip(1) {
        if arg == "--compact" {
            compact = true;
        } else {
            filename = Some(arg);
        }
    }

    let filename = match filename {
        Some(f) => f,
        None => {
            eprintln!("usage: open [--compact] <file | ->");
            process::exit(1);
        }
    };

    let result = if filename == "-" {
        process_input(io::stdin(), compact)
    } else {
        match File::open(&filename) {
            Ok(file) => process_input(file, compact),
            Err(e) => Err(format!("Can't open {}: {}", filename, e)),
        }
    };

    if let Err(message) = result {
        eprintln!("{}", message);
        process::exit(1);
    }
}
