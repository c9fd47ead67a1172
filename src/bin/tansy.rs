use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};

use tansy::{Interpreter, Repl, TansyError};

#[derive(Parser)]
#[command(author, version, about = "Tansy language runtime")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Transform and run a Tansy program file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Tansy code in the core environment
    Eval { source: String },
    /// Run the macro transformer over a program and print or serialize it
    Transform {
        script: PathBuf,
        /// Write the transformed program as a binary blob instead of printing
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serialize a single parsed expression to a binary blob
    Serialize { script: PathBuf, output: PathBuf },
    /// Deserialize a binary blob and print the value
    Deserialize { blob: PathBuf },
}

fn main() -> Result<(), TansyError> {
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script),
        Command::Repl => {
            let mut repl = Repl::new();
            repl.run()
        }
        Command::Eval { source } => {
            let mut interpreter = Interpreter::new();
            let value = interpreter.eval_source(&source)?;
            println!("{}", interpreter.heap().render(value));
            Ok(())
        }
        Command::Transform { script, output } => transform_script(script, output),
        Command::Serialize { script, output } => serialize_script(script, output),
        Command::Deserialize { blob } => deserialize_blob(blob),
    }
}

fn run_script(path: PathBuf) -> Result<(), TansyError> {
    let source = fs::read_to_string(&path)?;
    let mut interpreter = Interpreter::new();
    let result = interpreter.run_source(&source)?;
    println!("{}", interpreter.pretty(result, 0)?);
    Ok(())
}

fn transform_script(path: PathBuf, output: Option<PathBuf>) -> Result<(), TansyError> {
    let source = fs::read_to_string(&path)?;
    let mut interpreter = Interpreter::new();
    let forms = interpreter.parse_multi(&source)?;
    let transformed = interpreter.transform(forms)?;
    match output {
        Some(output) => fs::write(output, interpreter.serialize(transformed)?)?,
        None => println!("{}", interpreter.pretty(transformed, 0)?),
    }
    Ok(())
}

fn serialize_script(path: PathBuf, output: PathBuf) -> Result<(), TansyError> {
    let source = fs::read_to_string(&path)?;
    let mut interpreter = Interpreter::new();
    let value = interpreter.parse(&source)?;
    fs::write(output, interpreter.serialize(value)?)?;
    Ok(())
}

fn deserialize_blob(path: PathBuf) -> Result<(), TansyError> {
    let data = fs::read(&path)?;
    let mut interpreter = Interpreter::new();
    let value = interpreter.deserialize(&data)?;
    println!("{}", interpreter.pretty(value, 0)?);
    Ok(())
}
