//! Console entry point and composition root.
//!
//! # Responsibility
//! - Bring up logging, construct the connection factory and wire the service.
//! - Release storage resources on every exit path.

mod console;

use console::Console;
use log::error;
use std::io;
use std::process::ExitCode;
use usermgr_core::{
    default_log_level, init_logging, ConnectionFactory, SqliteUserRepository, UserService,
};

fn main() -> ExitCode {
    match std::env::current_dir() {
        Ok(dir) => {
            if let Err(err) = init_logging(default_log_level(), &dir.join("logs")) {
                eprintln!("File logging disabled: {err}");
            }
        }
        Err(err) => eprintln!("File logging disabled: {err}"),
    }

    let factory = ConnectionFactory::new();
    let service = UserService::new(SqliteUserRepository::new(&factory));

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = Console::new(stdin.lock(), stdout.lock(), &service).run();

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=app_error module=cli status=error error={err:#}");
            eprintln!("Critical error occurred. See logs for details.");
            ExitCode::FAILURE
        }
    };

    factory.shutdown();
    println!("Resources released successfully");
    code
}
