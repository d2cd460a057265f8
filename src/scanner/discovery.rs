use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_images(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        anyhow::bail!("{} is not a directory", directory.display());
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension() {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                if extensions.iter().any(|e| e.to_lowercase() == ext_lower) {
                    images.push(path.to_path_buf());
                }
            }
        }
    }

    // Sorted so batch order, and with it the cover photo, is stable
    images.sort();

    Ok(images)
}
