use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = pmsi_cli::build_cli().get_matches();

    let config = match pmsi_cli::load_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    pmsi_cli::init_tracing(&matches, &config);

    match pmsi_cli::run(&matches, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
