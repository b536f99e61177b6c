#[tokio::main]
async fn main() {
    if let Err(err) = pve_mcp::mcp::server::run_stdio().await {
        eprintln!("pve-mcp: {}", err);
        std::process::exit(1);
    }
}
