//! Breadcrumb compiler entry point.

fn main() {
    if let Err(e) = crumb::cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
