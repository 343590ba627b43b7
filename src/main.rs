fn main() -> std::process::ExitCode {
    summa_lib::run()
}
