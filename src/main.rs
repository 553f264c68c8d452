use std::process;

fn main() {
    if let Err(err) = bakeneko::app::run() {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}
