use colored::Colorize;
use std::process;

use zumo_e2e::config::Config;

fn init_logging(level: &str) {
    // RUST_LOG wins over the configured level
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let config = Config::build_config().unwrap_or_else(|err| {
        eprintln!("Error building config: {}", err);
        process::exit(2);
    });

    if config.help {
        let program = std::env::args().next().unwrap_or_else(|| "zumo-e2e".to_string());
        print!("{}", Config::usage(&program));
        return;
    }

    init_logging(&config.log_level);

    if config.list {
        match zumo_e2e::list(&config) {
            Ok(groups) => {
                for (group, tests) in groups {
                    println!("{}", group.bold());
                    for test in tests {
                        println!("\t{}", test);
                    }
                }
            }
            Err(err) => {
                eprintln!("Error listing tests: {:#}", err);
                process::exit(2);
            }
        }
        return;
    }

    match zumo_e2e::exec(&config) {
        Ok(summary) if summary.all_passed() => {}
        Ok(_) => process::exit(1),
        Err(err) => {
            eprintln!("Error executing test cases: {:#}", err);
            process::exit(2);
        }
    }
}
