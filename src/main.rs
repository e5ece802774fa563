use colored::Colorize;

fn main() {
    match decision_ledger::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {}", "Error:".bright_red().bold(), err);
            std::process::exit(2);
        }
    }
}
