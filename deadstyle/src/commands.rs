use clap::{Arg, ArgAction, arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn url_arg() -> Arg {
    arg!(-u --"url" <URL>)
        .required(true)
        .help("The page to start from")
        .value_parser(clap::value_parser!(Url))
}

fn network_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
    )
    .arg(
        arg!(--"user-agent" <UA>)
            .required(false)
            .help("User-Agent header sent with every request"),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("deadstyle")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("deadstyle")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log every link decision, fetch and skipped selector")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(network_args(
            command!("links")
                .about("Lists the same-site links found on a page (the candidates for a scan)")
                .arg(url_arg()),
        ))
        .subcommand(network_args(
            command!("scan")
                .about("Finds CSS selectors that match nothing on a page and the pages it links to")
                .arg(url_arg())
                .arg(
                    arg!(--"no-follow")
                        .required(false)
                        .help("Only analyze the starting page")
                        .action(ArgAction::SetTrue)
                        .conflicts_with_all(["interactive", "url-file", "exclude"]),
                )
                .arg(
                    arg!(-i --"interactive")
                        .required(false)
                        .help("Ask before analyzing each discovered link")
                        .action(ArgAction::SetTrue)
                        .conflicts_with_all(["url-file", "exclude"]),
                )
                .arg(
                    arg!(-x --"exclude" <PATTERN>)
                        .required(false)
                        .help("Skip discovered links containing PATTERN (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-H --"url-file" <PATH>)
                        .required(false)
                        .help("Newline-delimited list of pages to analyze instead of the discovered links")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("exclude"),
                )
                .arg(
                    arg!(--"cross-origin-styles")
                        .required(false)
                        .help("Also fetch stylesheets hosted on other sites (CDNs)")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"title" <TEXT>)
                        .required(false)
                        .help("Report title (default: the starting URL)"),
                ),
        ))
}
