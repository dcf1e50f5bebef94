#[tokio::main]
async fn main() {
    if let Err(e) = page_assist_lib::run().await {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
