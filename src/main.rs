use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, miette, IntoDiagnostic, NamedSource, Result, Severity};

use cellasm::{AsmParser, CellType, Config, Output, Program, RuntimeError};

/// cellasm runs programs written for a small memory-cell assembly language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.asm` file and print the final memory
    Run {
        /// `.asm` file to run
        name: PathBuf,
        #[command(flatten)]
        machine: MachineArgs,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a `.asm` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print a `.asm` file in canonical form
    Fmt {
        /// `.asm` file to format
        name: PathBuf,
    },
    /// Place a watch on a `.asm` file to receive constant assembler updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

#[derive(clap::Args)]
struct MachineArgs {
    /// Number of memory cells
    #[arg(short, long, default_value_t = cellasm::DEFAULT_CAPACITY)]
    cells: usize,
    /// Integer type of each cell (i8, i16, i32, i64, u8, u16, u32, u64)
    #[arg(short = 't', long, default_value_t = CellType::I32)]
    cell_type: CellType,
    /// Most instructions to execute before giving up [default: 1000000]
    #[arg(short, long)]
    step_limit: Option<u64>,
}

impl MachineArgs {
    fn config(&self) -> Config {
        let step_limit = self
            .step_limit
            .or_else(cellasm::env::step_limit)
            .unwrap_or(cellasm::DEFAULT_STEP_LIMIT);
        Config::new(self.cells).with_step_limit(step_limit)
    }
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env_logger::init();
    cellasm::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(cellasm::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run {
                name,
                machine,
                minimal,
            } => run(&name, &machine, minimal),
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let _ = assemble(&name, &read(&name)?)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
            Command::Fmt { name } => {
                let program = assemble(&name, &read(&name)?)?;
                print!("{program}");
                Ok(())
            }
            Command::Watch { name } => watch(name),
        }
    } else if let Some(path) = args.path {
        let machine = MachineArgs {
            cells: cellasm::DEFAULT_CAPACITY,
            cell_type: CellType::default(),
            step_limit: None,
        };
        run(&path, &machine, false)
    } else {
        println!("\n~ cellasm v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        Ok(())
    }
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

/// Status line on stderr, so stdout only carries results. Silenced by `--minimal`.
fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    Output::Info.print_str(&format!("{left:>12} {right}\n"));
}

fn read(name: &Path) -> Result<String> {
    if !name.exists() {
        bail!("File {} does not exist. Exiting...", name.display())
    }
    fs::read_to_string(name).into_diagnostic()
}

/// Assemble source text, attaching the named source to any diagnostic.
fn assemble(name: &Path, contents: &str) -> Result<Program> {
    AsmParser::new(contents)
        .and_then(AsmParser::parse)
        .map_err(|report| {
            report.with_source_code(NamedSource::new(
                name.display().to_string(),
                contents.to_owned(),
            ))
        })
}

fn run(name: &Path, machine: &MachineArgs, minimal: bool) -> Result<()> {
    Output::set_minimal(minimal);
    file_message(MsgColor::Green, "Assembling", name);
    let program = assemble(name, &read(name)?)?;

    let config = machine.config();
    message(
        MsgColor::Green,
        "Running",
        &format!(
            "{} cells of {} (limit {} steps)",
            config.capacity, machine.cell_type, config.step_limit
        ),
    );
    let (image, stats) = match cellasm::boot_as(machine.cell_type, config, &program) {
        Ok(res) => res,
        Err(err) => {
            file_message(MsgColor::Red, "Failed", name);
            return Err(runtime_report(err));
        }
    };

    let symbols: Vec<_> = program.declarations().collect();
    Output::Normal.print_image(&image, &symbols);
    Output::Info.print_stats(&stats);
    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

fn runtime_report(err: RuntimeError) -> miette::Report {
    match err.help() {
        Some(help) => miette!(
            severity = Severity::Error,
            code = err.code(),
            help = help,
            "{err}",
        ),
        None => miette!(severity = Severity::Error, code = err.code(), "{err}"),
    }
}

fn watch(name: PathBuf) -> Result<()> {
    use MsgColor::*;
    if !name.exists() {
        bail!("File does not exist. Exiting...")
    }
    // Vim breaks if watching a single file
    let folder_path = match name.parent() {
        Some(pth) if pth.is_dir() => pth.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    // Clear screen and move cursor to top left
    print!("\x1B[2J\x1B[2;1H");
    file_message(Green, "Watching", &name);
    message(Cyan, "Help", "press CTRL+C to exit");

    let mut watcher =
        Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

    watcher
        .watch(folder_path, move |event: Event| match event.kind {
            // Watch remove for vim changes
            EventKind::Modify(_) | EventKind::Remove(_) => {
                // Clear screen
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Green, "Re-checking", "file change detected");
                message(Cyan, "Help", "press CTRL+C to exit");

                // Now we are developing software (makes reruns more obvious)
                sleep(Duration::from_millis(50));

                let contents = match fs::read_to_string(&name) {
                    Ok(cts) => cts,
                    Err(e) => {
                        eprintln!("{e}. Exiting...");
                        return Flow::Exit;
                    }
                };
                match assemble(&name, &contents) {
                    Ok(_) => message(Green, "Success", "no errors found!"),
                    Err(e) => eprintln!("\n{:?}", e),
                }
                Flow::Continue
            }
            _ => Flow::Continue,
        })
        .into_diagnostic()?;
    watcher.run();
    Ok(())
}

const LOGO: &str = r#"
              _ _
   ___ ___| | | __ _ ___ _ __ ___
  / __/ _ \ | |/ _` / __| '_ ` _ \
 | (_|  __/ | | (_| \__ \ | | | | |
  \___\___|_|_|\__,_|___/_| |_| |_|"#;

const SHORT_INFO: &str = r"
Welcome to cellasm, an interpreter for a small assembly language
over flat memory of integer cells.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
