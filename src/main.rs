fn main() -> std::process::ExitCode {
    vitalens_lib::run()
}
