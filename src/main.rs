use std::process::ExitCode;

fn main() -> ExitCode {
    match medi_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("medi-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}
