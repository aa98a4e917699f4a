use bytecmp::compare::Comparator;
use bytecmp::output::Console;
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

fn program_name(args: &[OsString]) -> String {
    args.first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args: Vec<OsString> = std::env::args_os().collect();

    if args.len() != 3 {
        println!("usage: {} <file_1> <file_2>", program_name(&args));
        return ExitCode::FAILURE;
    }

    let console = Console::stdout();

    match Comparator::new().compare_paths(Path::new(&args[1]), Path::new(&args[2]), &console) {
        Ok(result) if result.is_match() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            log::debug!("comparison failed: {:?}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
