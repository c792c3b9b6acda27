use std::process;

fn main() {
    fintrack::init();
    if let Err(err) = fintrack::cli::run_cli() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
