fn main() {
    if let Err(err) = seq_cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
