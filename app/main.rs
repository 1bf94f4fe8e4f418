use std::{
    path::Path,
    process::ExitCode,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use snap::Repository;

/// Exit status when no command is given at all.
const USAGE_EXIT: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "snap", version, about = "a git-compatible revision control tool")]
struct Arguments {
    #[clap(subcommand)]
    cmd: Option<Command>,
}

/// Arguments of commands that are accepted but do nothing yet.
#[derive(Args, Debug)]
struct Ignored {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "create an empty repository or reinitialize an existing one")]
    Init {
        #[arg(help = "directory to initialize, defaults to the current one")]
        path: Option<String>,
    },
    Add(Ignored),
    CatFile(Ignored),
    CheckIgnore(Ignored),
    Checkout(Ignored),
    Commit(Ignored),
    HashObject(Ignored),
    Log(Ignored),
    LsFiles(Ignored),
    LsTree(Ignored),
    RevParse(Ignored),
    Rm(Ignored),
    ShowRef(Ignored),
    Status(Ignored),
    Tag(Ignored),
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    use Command::*;
    let cmd = match args.cmd {
        Some(cmd) => cmd,
        None => {
            eprintln!("snap expects at least one command.");
            eprintln!("{}", Arguments::command().render_usage());
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let result = match cmd {
        Init { path } => init(path.as_deref()),
        other => {
            log::debug!("{:?} is not implemented, ignoring", other);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("failed with {:?}", err);
            eprintln!("fatal: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn init(path: Option<&str>) -> snap::Result<()> {
    let path = match path {
        Some(path) if !path.is_empty() => Path::new(path),
        _ => Path::new("."),
    };
    let repo = Repository::init(path)?;
    println!(
        "Initialized empty Git repository in {}/",
        repo.git_dir().display()
    );
    Ok(())
}
