use crate::demo::{run_demo, run_status, run_steps, run_validate, DemoArgs, StatusArgs, ValidateArgs};
use crate::server;
use admissions::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Admissions Enrollment Wizard",
    about = "Run and exercise the university admission enrollment wizard from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List the wizard steps and the fields each one collects
    Steps,
    /// Look up a saved application by admission code
    Status(StatusArgs),
    /// Validate a JSON record against one step without contacting the backend
    Validate(ValidateArgs),
    /// Walk a sample applicant through every step against an in-memory backend
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Steps => run_steps(),
        Command::Status(args) => run_status(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["admissions-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn validate_accepts_step_keys_and_attachments() {
        let cli = Cli::try_parse_from([
            "admissions-api",
            "validate",
            "--step",
            "student",
            "--file",
            "record.json",
            "--attach",
            "profile_image=photo.png",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Validate(args)) => {
                assert_eq!(args.step, admissions::workflows::enrollment::StepKind::Student);
                assert_eq!(args.attach.len(), 1);
                assert_eq!(args.attach[0].field, "profile_image");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_step_key_is_rejected() {
        let err = Cli::try_parse_from([
            "admissions-api",
            "validate",
            "--step",
            "hobbies",
            "--file",
            "record.json",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("hobbies"));
    }
}
