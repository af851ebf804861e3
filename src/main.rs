use clap::Parser as ClapParser;

use just_sh::frontend;
use just_sh::parser::Parser;
use just_sh::shell::os;
use just_sh::shell::state::ShellState;

#[derive(ClapParser)]
#[command(name = "just-sh")]
#[command(about = "A POSIX command-language interpreter")]
#[command(version)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Execute the given command string
    #[arg(short = 'c')]
    command: Option<String>,

    /// Read commands from standard input
    #[arg(short = 's')]
    stdin_mode: bool,

    /// Interactive shell
    #[arg(short = 'i')]
    interactive: bool,

    /// Export every assigned variable (set -a)
    #[arg(short = 'a')]
    allexport: bool,

    /// Report job completions asynchronously (set -b)
    #[arg(short = 'b')]
    notify: bool,

    /// Do not truncate existing files with > (set -C)
    #[arg(short = 'C')]
    noclobber: bool,

    /// Exit on a failing command (set -e)
    #[arg(short = 'e')]
    errexit: bool,

    /// Disable pathname expansion (set -f)
    #[arg(short = 'f')]
    noglob: bool,

    /// Cache command locations (set -h)
    #[arg(short = 'h')]
    prelookup: bool,

    /// Enable job control (set -m)
    #[arg(short = 'm')]
    monitor: bool,

    /// Read commands without executing them (set -n)
    #[arg(short = 'n')]
    noexec: bool,

    /// Error on unset parameters (set -u)
    #[arg(short = 'u')]
    nounset: bool,

    /// Echo input lines as they are read (set -v)
    #[arg(short = 'v')]
    verbose: bool,

    /// Trace commands after expansion (set -x)
    #[arg(short = 'x')]
    xtrace: bool,

    /// Long option toggles (set -o <option>)
    #[arg(short = 'o')]
    options: Vec<String>,

    /// Script file (or command name with -c) and positional parameters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    operands: Vec<String>,
}

fn apply_cli_options(cli: &Cli, state: &mut ShellState) -> Result<(), String> {
    let options = &mut state.options;
    options.allexport |= cli.allexport;
    options.notify |= cli.notify;
    options.noclobber |= cli.noclobber;
    options.errexit |= cli.errexit;
    options.noglob |= cli.noglob;
    options.prelookup |= cli.prelookup;
    options.monitor |= cli.monitor;
    options.noexec |= cli.noexec;
    options.nounset |= cli.nounset;
    options.verbose |= cli.verbose;
    options.xtrace |= cli.xtrace;

    for name in &cli.options {
        if !options.set_long(name, true) {
            return Err(format!("unknown option -o {}", name));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let script_path = if cli.command.is_none() && !cli.stdin_mode {
        cli.operands.first().cloned()
    } else {
        None
    };

    // $0 is the -c command name operand, the script path, or the shell
    // name.
    let argv0 = if cli.command.is_some() {
        cli.operands.first().cloned().unwrap_or_else(|| "just-sh".to_string())
    } else {
        script_path.clone().unwrap_or_else(|| "just-sh".to_string())
    };

    let mut state = ShellState::new(vec![argv0]);

    if let Err(err) = apply_cli_options(&cli, &mut state) {
        eprintln!("{}: {}", state.name(), err);
        std::process::exit(2);
    }

    state.interactive = cli.interactive
        || (cli.command.is_none() && script_path.is_none() && os::isatty(0));

    state.populate_env();

    let params_start = if cli.command.is_some() || script_path.is_some() { 1 } else { 0 };
    let params: Vec<String> = cli.operands.iter().skip(params_start).cloned().collect();
    state.set_positional_params(params);

    if state.interactive {
        // Job control needs a controlling terminal.
        if os::isatty(0) {
            state.term_fd = 0;
            state.options.monitor = true;
            state.set_job_control(true);
        }
        frontend::source_env_file(&mut state);
    }

    let code = if let Some(command) = &cli.command {
        frontend::run_string(&mut state, command)
    } else if let Some(path) = &script_path {
        match frontend::read_script(&state, path) {
            Ok(source) => frontend::run_string(&mut state, &source),
            Err(code) => code,
        }
    } else if state.interactive {
        frontend::run_interactive(&mut state)
    } else {
        frontend::run_from_parser(
            &mut state,
            Parser::from_reader(Box::new(std::io::stdin())),
        )
    };

    os::flush_stdio();
    std::process::exit(code);
}
