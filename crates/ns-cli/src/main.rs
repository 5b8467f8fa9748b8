fn main() {
    let code = ns_cli::run_cli_from_args(std::env::args_os());
    std::process::exit(code);
}
