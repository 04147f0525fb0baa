//! Version command

/// Run the version command.
pub fn run() {
    println!("consul-up {}", env!("CARGO_PKG_VERSION"));
}
