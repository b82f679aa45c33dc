pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_HOST: &str = "host";
pub const ARG_DSN: &str = "dsn";

pub const DEFAULT_DSN: &str = "sqlite://authgate.db?mode=rwc";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("authgate")
        .about("User accounts API with pluggable authentication")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("5000")
                .env("API_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_HOST)
                .long(ARG_HOST)
                .help("Address to bind")
                .default_value("0.0.0.0")
                .env("API_HOST"),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string, example: sqlite://authgate.db?mode=rwc")
                .default_value(DEFAULT_DSN)
                .env("AUTHGATE_DSN"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
