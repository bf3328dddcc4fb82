use deadstyle::commands::command_argument_builder;
use deadstyle::handlers::{handle_links, handle_scan, init_tracing};
use deadstyle_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(chosen_command.get_flag("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("links", primary_command)) => handle_links(primary_command).await,
        Some(("scan", primary_command)) => handle_scan(primary_command, quiet).await,
        // No subcommand provided, just show the banner
        None => {}
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
