use std::process::ExitCode;

fn main() -> ExitCode {
    match covid_at_timeseries::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
