fn main() {
    if let Err(err) = graph_aesthetics::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
