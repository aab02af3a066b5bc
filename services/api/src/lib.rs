mod cli;
mod infra;
mod routes;
mod server;

use contract_lifecycle::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
