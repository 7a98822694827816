fn main() {
    if let Err(e) = formgate::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
