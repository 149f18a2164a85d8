fn main() {
    metagram::cli::run();
}
