//! Command-line surface: `serve --config <path> --metrics-port <p>` runs
//! the daemon, `status --config <path>` prints a one-shot sync summary and
//! exits without starting the metrics server.

use clap::{App, AppSettings, Arg, SubCommand};

pub enum Command {
    Serve { config_path: String, metrics_port: u16 },
    Status { config_path: String },
}

pub fn parse() -> Command {
    let matches = App::new("node_exporter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prometheus exporter for paired execution/consensus Ethereum nodes")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("serve")
                .about("Runs the exporter daemon")
                .arg(
                    Arg::with_name("config")
                        .long("config")
                        .value_name("PATH")
                        .required(true)
                        .takes_value(true)
                        .help("Path to the YAML configuration file"),
                )
                .arg(
                    Arg::with_name("metrics-port")
                        .long("metrics-port")
                        .value_name("PORT")
                        .takes_value(true)
                        .default_value("9100")
                        .help("Port to serve /metrics and / on"),
                ),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Prints a one-shot sync status summary and exits")
                .arg(
                    Arg::with_name("config")
                        .long("config")
                        .value_name("PATH")
                        .required(true)
                        .takes_value(true)
                        .help("Path to the YAML configuration file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("serve", Some(sub)) => Command::Serve {
            config_path: sub.value_of("config").expect("required").to_string(),
            metrics_port: sub
                .value_of("metrics-port")
                .expect("has default")
                .parse()
                .unwrap_or(9100),
        },
        ("status", Some(sub)) => Command::Status {
            config_path: sub.value_of("config").expect("required").to_string(),
        },
        _ => unreachable!("SubcommandRequiredElseHelp exits before reaching here"),
    }
}
