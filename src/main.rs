//! sqlcoach - SQL practice with automatic answer verification.

mod cli;

use anyhow::Context;
use cli::{read_sql, target, Cli, Command};
use sqlcoach::app::App;
use sqlcoach::config::Config;
use sqlcoach::error::CoachError;
use sqlcoach::logging;
use sqlcoach::output;
use sqlcoach::query::split_statements;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    if let Some(path) = logging::init(cli.log_target()) {
        info!("Logging to {}", path.display());
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<CoachError>() {
                Some(err) => error!("{}: {}", err.category(), err),
                None => error!("{:#}", e),
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load(&config_path)?;
    cli.apply_overrides(&mut config);

    let app = App::start(&config)
        .await
        .context("Failed to start the database system")?;
    let code = dispatch(&cli, &app, &config).await;
    app.shutdown().await;
    code
}

async fn dispatch(cli: &Cli, app: &App, config: &Config) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Questions { difficulty } => {
            let questions = match difficulty {
                Some(d) => app.questions().by_difficulty(*d),
                None => app.questions().all().iter().collect(),
            };
            if cli.json {
                println!("{}", output::to_json(&questions)?);
            } else {
                print!("{}", output::render_question_list(&questions));
                if difficulty.is_none() {
                    let counts = app.questions().counts_by_difficulty();
                    print!("{}", output::render_catalog_summary(&counts));
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Show { id } => {
            let question = app
                .questions()
                .get(id)
                .ok_or_else(|| CoachError::QuestionNotFound(id.clone()))?;
            if cli.json {
                println!("{}", output::to_json(question)?);
            } else {
                print!("{}", output::render_question(question));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Run { main, sql, .. } => {
            let sql = read_sql(sql)?;
            let options = cli.run_options(config.execution.options());
            let kind = target(*main);

            let mut statements = split_statements(&sql);
            if statements.is_empty() {
                // Let the engine report the blank input.
                statements.push(sql);
            }

            let mut results = Vec::with_capacity(statements.len());
            for statement in &statements {
                let result = app.execute_with(statement, kind, &options).await?;
                let failed = !result.success;
                results.push(result);
                if failed {
                    break;
                }
            }

            if cli.json {
                println!("{}", output::to_json(&results)?);
            } else {
                for result in &results {
                    print!("{}", output::render_result(result));
                }
            }
            Ok(exit_code(results.iter().all(|r| r.success)))
        }

        Command::Syntax { main, sql } => {
            let sql = read_sql(sql)?;
            let check = app.validate_syntax(&sql, target(*main)).await?;
            if cli.json {
                println!("{}", output::to_json(&check)?);
            } else {
                print!("{}", output::render_syntax(&check));
            }
            Ok(exit_code(check.valid))
        }

        Command::Check { id, sql } => {
            let sql = read_sql(sql)?;
            let outcome = app.validate(id, &sql).await?;
            if cli.json {
                println!("{}", output::to_json(&outcome)?);
            } else {
                print!("{}", output::render_outcome(&outcome));
            }
            Ok(exit_code(outcome.correct))
        }

        Command::Tables { main } => {
            let schema = app.introspect(target(*main)).await?;
            if cli.json {
                println!("{}", output::to_json(&schema)?);
            } else {
                print!("{}", output::render_schema(&schema));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
