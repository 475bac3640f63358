use std::process::ExitCode;

fn main() -> ExitCode {
    match unreal_mcpd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("unreal-mcpd: {error}");
            ExitCode::FAILURE
        }
    }
}
