#[tokio::main]
async fn main() -> anyhow::Result<()> {
    study_automator_backend::run().await
}
