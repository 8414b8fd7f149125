//! Command implementations for lanework-cmd

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

pub mod fetch;
pub mod plan;

/// Converts a source string to a local file path.
///
/// `file://` URLs are converted to their path; any other URL scheme is
/// rejected. Anything that does not parse as a URL is treated as a file path,
/// made absolute against the current directory.
pub fn source_to_path(path_or_url: &str) -> Result<PathBuf> {
    if let Ok(url) = Url::parse(path_or_url) {
        // Single-letter schemes are Windows drive letters, not URLs.
        if url.scheme().len() > 1 {
            if url.scheme() != "file" {
                anyhow::bail!("Unsupported source scheme '{}': {}", url.scheme(), url);
            }
            return url
                .to_file_path()
                .map_err(|()| anyhow::anyhow!("Failed to convert URL to path: {}", url));
        }
    }

    let path = Path::new(path_or_url);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()
            .with_context(|| "Failed to get current directory")?
            .join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::source_to_path;

    #[test]
    fn test_source_to_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(source_to_path("seg/0.ts").unwrap(), cwd.join("seg/0.ts"));

        let abs = cwd.join("x.bin");
        assert_eq!(source_to_path(abs.to_str().unwrap()).unwrap(), abs);

        let url = url::Url::from_file_path(&abs).unwrap();
        assert_eq!(source_to_path(url.as_str()).unwrap(), abs);

        let err = source_to_path("https://example.com/seg.ts").unwrap_err();
        assert!(err.to_string().contains("Unsupported source scheme"));
    }
}
