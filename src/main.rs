fn main() {
    if let Err(err) = moviz::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
