use serde_json::{Value, json};
use session_client::{ApiClient, Config, MultipartPayload, RequestOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the demo
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // SESSION_CLIENT_BASE_URL must point at the backend
    let client = ApiClient::new(Config::from_env()?)?;

    client
        .login(&json!({"email": "demo@example.com", "password": "demo"}))
        .await?;

    let opportunities: Vec<Value> = client
        .request(RequestOptions::get("/opportunities").query("status", "open"))
        .await?;
    println!("{} open opportunities", opportunities.len());

    let resume = MultipartPayload::new().file("file", "resume.txt", b"Rust, Tokio, HTTP".to_vec());
    let _: Value = client
        .request(RequestOptions::post("/talent/resume").multipart(resume))
        .await?;

    client.logout().await?;
    Ok(())
}
