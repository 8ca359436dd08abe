use clap::{Parser, Subcommand};
use color_print::cprintln;
use sinasm::line::Line;
use sinasm::object::ObjectFile;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[clap(name = "sinasm", version, about = "Assembler and linker for the SIN VM")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble SINASM sources into a sinC object file
    Asm {
        /// Input files, concatenated into one translation unit
        input: Vec<PathBuf>,
        #[clap(short, long, default_value = "out.sinc")]
        output: PathBuf,
        /// Print a source listing while assembling
        #[clap(short, long)]
        listing: bool,
    },
    /// Link sinC object files into an executable image
    Link {
        input: Vec<PathBuf>,
        #[clap(short, long, default_value = "out.sinx")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            cprintln!("<red,bold>error</>: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    match args.command {
        Command::Asm {
            input,
            output,
            listing,
        } => {
            if input.is_empty() {
                return Err("no input files".into());
            }
            let mut source = String::new();
            for path in &input {
                source.push_str(&expand_includes(path, 0)?);
            }
            if listing {
                for (idx, raw) in source.lines().enumerate() {
                    if let Ok(line) = Line::parse(&input[0].display().to_string(), idx, raw) {
                        println!("{}", line.cprint());
                    }
                }
            }
            let object = sinasm::assemble(&source).map_err(|e| e.to_string())?;
            let mut file = BufWriter::new(create(&output)?);
            object.write(&mut file).map_err(|e| e.to_string())?;
            cprintln!(
                "<green>assembled</> {} bytes of text, {} symbols, {} relocations -> {}",
                object.text.len(),
                object.symbols.len(),
                object.relocations.len(),
                output.display()
            );
            Ok(())
        }
        Command::Link { input, output } => {
            if input.is_empty() {
                return Err("no input files".into());
            }
            let mut objects = Vec::with_capacity(input.len());
            for path in &input {
                let mut file = open(path)?;
                let object = ObjectFile::read(&mut file)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                objects.push(object);
            }
            let image = sinasm::link(&objects).map_err(|e| e.to_string())?;
            let mut file = BufWriter::new(create(&output)?);
            image.write(&mut file).map_err(|e| e.to_string())?;
            cprintln!(
                "<green>linked</> {} bytes at ${:04X}, entry ${:04X} -> {}",
                image.bytes.len(),
                arch::mem::PRG_BOTTOM,
                image.entry,
                output.display()
            );
            Ok(())
        }
    }
}

/// Reads a source file, splicing `@include "file"` lines in place.
/// Paths resolve relative to the including file.
fn expand_includes(path: &Path, depth: usize) -> Result<String, String> {
    if depth > 16 {
        return Err(format!("{}: include nesting too deep", path.display()));
    }
    let mut text = String::new();
    open(path)?
        .read_to_string(&mut text)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("@include") {
            let name = rest.trim().trim_matches('"');
            let target = path.parent().unwrap_or(Path::new(".")).join(name);
            out.push_str(&expand_includes(&target, depth + 1)?);
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

fn open(path: &Path) -> Result<File, String> {
    File::open(path).map_err(|e| format!("{}: {}", path.display(), e))
}

fn create(path: &Path) -> Result<File, String> {
    File::create(path).map_err(|e| format!("{}: {}", path.display(), e))
}
