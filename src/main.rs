use std::process::ExitCode;

#[actix_web::main]
async fn main() -> ExitCode {
    match equiview::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("equiview: {}", e);
            ExitCode::FAILURE
        }
    }
}
