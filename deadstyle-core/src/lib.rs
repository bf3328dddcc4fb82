pub mod audit;
pub mod report;

use colored::Colorize;

const BANNER: &str = r#"
     _                _     _         _
  __| | ___  __ _  __| |___| |_ _   _| | ___
 / _` |/ _ \/ _` |/ _` / __| __| | | | |/ _ \
| (_| |  __/ (_| | (_| \__ \ |_| |_| | |  __/
 \__,_|\___|\__,_|\__,_|___/\__|\__, |_|\___|
                                |___/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} v{}\n",
        "unused CSS selector finder".bright_white(),
        env!("CARGO_PKG_VERSION")
    );
}
