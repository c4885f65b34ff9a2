//! svconform CLI entry point

fn main() {
    svconform::cli::run();
}
