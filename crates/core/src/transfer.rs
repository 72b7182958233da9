use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// Wire format, one file per connection: a 10-byte zero-padded ASCII decimal
// file size, the file name terminated by '\n', then exactly `size` raw bytes.
const SIZE_HEADER_LEN: usize = 10;
const MAX_TRANSFER_SIZE: u64 = 9_999_999_999;
const MAX_NAME_LEN: usize = 1024;

pub async fn send_file<W: AsyncWrite + Unpin>(writer: &mut W, path: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    let file_size = meta.len();
    if file_size > MAX_TRANSFER_SIZE {
        bail!("{} is too large for the size header ({} bytes)", path.display(), file_size);
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no UTF-8 file name", path.display()))?;

    writer.write_all(format!("{:010}", file_size).as_bytes()).await?;
    writer.write_all(file_name.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let sent = tokio::io::copy(&mut file, writer).await?;
    if sent != file_size {
        bail!("{} changed size mid-transfer ({} of {} bytes sent)", path.display(), sent, file_size);
    }
    writer.flush().await?;
    Ok(())
}

/// Reads one file from the wire into `output_folder` and returns its path.
/// The received name is reduced to its final component so a sender cannot
/// place files outside the folder.
pub async fn receive_file<R: AsyncRead + Unpin>(reader: &mut R, output_folder: &Path) -> Result<PathBuf> {
    let mut size_buf = [0u8; SIZE_HEADER_LEN];
    reader
        .read_exact(&mut size_buf)
        .await
        .context("Connection closed before the size header")?;
    let file_size: u64 = std::str::from_utf8(&size_buf)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .context("Size header is not a decimal number")?;

    let mut name_bytes = Vec::new();
    loop {
        let byte = reader.read_u8().await.context("Connection closed inside the file name")?;
        if byte == b'\n' {
            break;
        }
        name_bytes.push(byte);
        if name_bytes.len() > MAX_NAME_LEN {
            bail!("File name exceeds {} bytes", MAX_NAME_LEN);
        }
    }
    let raw_name = String::from_utf8(name_bytes).context("File name is not valid UTF-8")?;
    let file_name = Path::new(raw_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| *n != "..")
        .with_context(|| format!("Unusable file name on the wire: {:?}", raw_name))?
        .to_string();

    tokio::fs::create_dir_all(output_folder)
        .await
        .with_context(|| format!("Failed to create {}", output_folder.display()))?;
    let target = output_folder.join(&file_name);
    let mut file = File::create(&target)
        .await
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let received = tokio::io::copy(&mut reader.take(file_size), &mut file).await?;
    if received != file_size {
        bail!(
            "Connection closed mid-transfer for {} ({} of {} bytes)",
            file_name,
            received,
            file_size
        );
    }
    file.flush().await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn round_trip(contents: &[u8], name: &str) -> (PathBuf, Vec<u8>) {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join(name);
        tokio::fs::write(&src, contents).await.unwrap();

        let (mut tx, mut rx) = tokio::io::duplex(256);
        let send = tokio::spawn(async move {
            send_file(&mut tx, &src).await.unwrap();
        });
        let received = receive_file(&mut rx, dst_dir.path()).await.unwrap();
        send.await.unwrap();

        let bytes = tokio::fs::read(&received).await.unwrap();
        (received.strip_prefix(dst_dir.path()).unwrap().to_path_buf(), bytes)
    }

    #[tokio::test]
    async fn sends_and_receives_contents() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let (name, bytes) = round_trip(&payload, "cam1.mkv").await;
        assert_eq!(name, PathBuf::from("cam1.mkv"));
        assert_eq!(bytes, payload);
    }

    #[tokio::test]
    async fn empty_files_are_valid() {
        let (name, bytes) = round_trip(b"", "empty.mkv").await;
        assert_eq!(name, PathBuf::from("empty.mkv"));
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn rejects_garbage_size_header() {
        let dst = tempfile::tempdir().unwrap();
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"not-a-sizefile.mkv\n").await.unwrap();
        drop(tx);
        assert!(receive_file(&mut rx, dst.path()).await.is_err());
    }

    #[tokio::test]
    async fn rejects_truncated_body() {
        let dst = tempfile::tempdir().unwrap();
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"0000000100short.mkv\n").await.unwrap();
        tx.write_all(&[7u8; 10]).await.unwrap();
        drop(tx);
        assert!(receive_file(&mut rx, dst.path()).await.is_err());
    }

    #[tokio::test]
    async fn strips_directory_components_from_names() {
        let dst = tempfile::tempdir().unwrap();
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"0000000003../../../evil\n").await.unwrap();
        tx.write_all(b"abc").await.unwrap();
        drop(tx);
        let path = receive_file(&mut rx, dst.path()).await.unwrap();
        assert_eq!(path, dst.path().join("evil"));
    }
}
