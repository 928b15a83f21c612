fn main() {
    echomask::cli::run();
}
