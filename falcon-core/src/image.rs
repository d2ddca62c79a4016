//! Local image file helpers
//!
//! Resizing and probing shell out to platform tools (`sips`, ImageMagick,
//! `file`); every helper degrades gracefully when a tool is missing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use base64::Engine;
use chrono::Utc;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::format::format_bytes;

/// Prefix of every temp file falcon creates.
pub const TEMP_PREFIX: &str = "falcon-";

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Download `url` to `path`. `data:` URLs are decoded in place.
pub async fn download(url: &str, path: &Path) -> Result<()> {
    let bytes = if let Some(encoded) = url.strip_prefix("data:") {
        decode_data_url(encoded)?
    } else {
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "Failed to download image: HTTP {}",
                status
            )));
        }
        response.bytes().await?.to_vec()
    };

    tokio::fs::write(path, &bytes).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Downloaded image");
    Ok(())
}

fn decode_data_url(encoded: &str) -> Result<Vec<u8>> {
    let (_, payload) = encoded
        .split_once(";base64,")
        .ok_or_else(|| Error::Transport("unsupported data URL".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Transport(format!("invalid data URL: {}", e)))
}

/// Read a local image and encode it as a base64 data URL.
pub async fn to_data_url(path: &Path) -> Result<String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Validation(format!(
                "Image not found: {}",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_type(path), encoded))
}

fn mime_type(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Lowercased file extension.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Shrink an image so its longest side is at most `max_size`.
///
/// Tries `sips`, then ImageMagick `convert`. Returns the path of a temp copy,
/// or `path` itself when neither tool succeeds.
pub async fn resize(path: &Path, max_size: u32) -> PathBuf {
    let temp = std::env::temp_dir().join(format!(
        "{}resize-{}.png",
        TEMP_PREFIX,
        uuid::Uuid::new_v4()
    ));
    let size = max_size.to_string();

    let mut sips = Command::new("sips");
    sips.arg("-Z").arg(&size).arg(path).arg("--out").arg(&temp);
    if run_quietly(sips).await && temp.exists() {
        return temp;
    }

    let mut convert = Command::new("convert");
    convert
        .arg(path)
        .arg("-resize")
        .arg(format!("{}x{}>", size, size))
        .arg(&temp);
    if run_quietly(convert).await && temp.exists() {
        return temp;
    }

    tracing::debug!(path = %path.display(), "No resize tool available, using original");
    path.to_path_buf()
}

async fn run_quietly(mut command: Command) -> bool {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match command.status().await {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

/// Probe image dimensions from `file` output.
pub async fn dimensions(path: &Path) -> Option<Dimensions> {
    let output = Command::new("file")
        .arg("-b")
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
}

/// Extract `W x H` from `file` output.
///
/// The last match wins: JPEG descriptions list the pixel density before the size.
pub fn parse_dimensions(output: &str) -> Option<Dimensions> {
    let bytes = output.as_bytes();
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        let starts_number = bytes[i].is_ascii_digit() && (i == 0 || !bytes[i - 1].is_ascii_digit());
        if starts_number {
            if let Some((dims, end)) = dimensions_at(output, i) {
                found = Some(dims);
                i = end;
                continue;
            }
        }
        i += 1;
    }
    found
}

fn dimensions_at(s: &str, start: usize) -> Option<(Dimensions, usize)> {
    let rest = &s[start..];
    let width_len = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    let after_x = rest[width_len..].trim_start().strip_prefix('x')?;
    let height_str = after_x.trim_start();
    let height_len = height_str.bytes().take_while(|b| b.is_ascii_digit()).count();
    if height_len == 0 {
        return None;
    }

    let dims = Dimensions {
        width: rest[..width_len].parse().ok()?,
        height: height_str[..height_len].parse().ok()?,
    };
    let end = s.len() - height_str.len() + height_len;
    Some((dims, end))
}

/// Human-readable size of a file.
pub async fn file_size(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(format_bytes(metadata.len()))
}

/// `<prefix>-YYYYMMDDHHMMSS.png` in UTC.
pub fn generate_filename(prefix: &str) -> String {
    format!("{}-{}.png", prefix, Utc::now().format("%Y%m%d%H%M%S"))
}

/// Sibling of `path` named `<stem><suffix>.<ext>`.
pub fn sibling(path: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fal".to_string());
    path.with_file_name(format!("{}{}.{}", stem, suffix, ext))
}

/// Resolve `path` against the working directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Open an image in the platform viewer without waiting for it.
pub fn open(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::Validation(format!(
            "Image not found: {}",
            path.display()
        )));
    }
    let path = absolute(path)?;

    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "linux") {
        "xdg-open"
    } else {
        tracing::debug!("No image viewer for this platform");
        return Ok(());
    };

    match spawn_reaped(program, &path) {
        Ok(_) => tracing::debug!(path = %path.display(), program, "Opened image"),
        Err(e) => tracing::warn!(program, error = %e, "Failed to open image viewer"),
    }
    Ok(())
}

/// Start `program <arg>` detached, with a task that waits on it so it never lingers as a zombie.
fn spawn_reaped(program: &str, arg: &Path) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let mut child = Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let program = program.to_string();
    Ok(runtime.spawn(async move {
        match child.wait().await {
            Ok(status) => tracing::debug!(program, %status, "Viewer exited"),
            Err(e) => tracing::debug!(program, error = %e, "Viewer wait failed"),
        }
    }))
}

/// Remove a temp file created by [`resize`]. Other paths are left alone.
pub fn delete_temp_file(path: &Path) {
    let in_temp_dir = path.parent() == Some(std::env::temp_dir().as_path());
    let ours = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with(TEMP_PREFIX));
    if !(in_temp_dir && ours) {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Temp file cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png_dimensions() {
        let out = "PNG image data, 1024 x 1536, 8-bit/color RGBA, non-interlaced";
        assert_eq!(
            parse_dimensions(out),
            Some(Dimensions {
                width: 1024,
                height: 1536
            })
        );
    }

    #[test]
    fn test_parse_jpeg_prefers_size_over_density() {
        let out = "JPEG image data, JFIF standard 1.01, aspect ratio, density 72x72, \
                   segment length 16, baseline, precision 8, 2048x1152, components 3";
        assert_eq!(
            parse_dimensions(out),
            Some(Dimensions {
                width: 2048,
                height: 1152
            })
        );
        assert_eq!(parse_dimensions("ASCII text"), None);
    }

    #[test]
    fn test_generate_filename_shape() {
        let name = generate_filename("fal");
        assert!(name.starts_with("fal-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "fal-".len() + 14 + ".png".len());
    }

    #[test]
    fn test_sibling_names() {
        let src = Path::new("/work/fal-20250101120000.png");
        assert_eq!(
            sibling(src, "-up2x", "png"),
            PathBuf::from("/work/fal-20250101120000-up2x.png")
        );
        assert_eq!(
            sibling(Path::new("shot.jpg"), "-nobg", "png"),
            PathBuf::from("shot-nobg.png")
        );
    }

    #[tokio::test]
    async fn test_data_url_mime_and_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let jpg = tmp.path().join("a.JPG");
        std::fs::write(&jpg, b"\xff\xd8bytes").unwrap();

        let url = to_data_url(&jpg).await.unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let out = tmp.path().join("out.bin");
        download(&url, &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"\xff\xd8bytes");

        let missing = to_data_url(&tmp.path().join("missing.png")).await;
        assert!(matches!(missing, Err(Error::Validation(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawned_viewer_is_waited_on() {
        let reaper = spawn_reaped("true", Path::new(".")).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(10), reaper)
            .await
            .expect("viewer was not reaped")
            .unwrap();
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        assert!(spawn_reaped("true", Path::new(".")).is_err());
    }

    #[test]
    fn test_delete_temp_file_only_touches_own_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let foreign = tmp.path().join("falcon-resize-x.png");
        std::fs::write(&foreign, b"keep").unwrap();
        delete_temp_file(&foreign);
        assert!(foreign.exists());

        let ours = std::env::temp_dir().join(format!(
            "{}resize-{}.png",
            TEMP_PREFIX,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&ours, b"x").unwrap();
        delete_temp_file(&ours);
        assert!(!ours.exists());
    }
}
