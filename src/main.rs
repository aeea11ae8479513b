mod cli;
mod cohort;
mod commands;
mod env_loader;
mod error;
mod logging;

fn main() {
    env_loader::load_dotenv();

    if let Err(err) = cli::run() {
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<error::CohortError>())
            .map(|cohort_err| cohort_err.code().as_str());
        match code {
            Some(code) => eprintln!("error[{code}]: {err:#}"),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}
