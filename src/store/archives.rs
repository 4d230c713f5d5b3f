use anyhow::{anyhow, bail, Result};
use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_tar::ArchiveBuilder;
use tracing::debug;

async fn unpack_tar<R>(reader: R, target_dir: &Path) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let archive_builder = ArchiveBuilder::new(reader)
        .set_preserve_permissions(true)
        .set_ignore_zeros(true);
    let mut archive = archive_builder.build();

    Ok(archive.unpack(target_dir).await?)
}

/// Unpacks a compressed tarball into `target_dir`, detecting the
/// compression from the archive's magic bytes.
pub async fn unpack(source_archive: &Path, target_dir: &Path) -> Result<()> {
    let kind = infer::get_from_path(source_archive)?
        .ok_or_else(|| anyhow!("unknown archive type: {}", source_archive.display()))?;

    debug!(
        "unpacking {} ({})",
        source_archive.display(),
        kind.mime_type()
    );

    let reader = BufReader::new(File::open(source_archive).await?);

    match kind.mime_type() {
        "application/gzip" => unpack_tar(GzipDecoder::new(reader), target_dir).await,
        "application/x-bzip2" => unpack_tar(BzDecoder::new(reader), target_dir).await,
        "application/x-xz" => unpack_tar(XzDecoder::new(reader), target_dir).await,
        mime => bail!(
            "unsupported archive type {}: {}",
            mime,
            source_archive.display()
        ),
    }
}
