use blob_mover::{app, pipeline::Variant};

/// Moves blobs not modified since the cutoff into an existing container.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run(Variant::Archive).await
}
