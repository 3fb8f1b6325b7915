use blob_mover::{app, pipeline::Variant};

/// Moves blobs modified since the cutoff, creating containers as needed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run(Variant::Transfer).await
}
