//! Direct VFAT assembly via the `fatfs` crate, used when no host `mkfs.vfat`/
//! `mcopy` binary is available. `fatfs` is synchronous, so this runs inside
//! `tokio::task::spawn_blocking`.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use fatfs::{FileSystem, FormatVolumeOptions, FsOptions};
use volant_core::{Error, Result};

const IMAGE_SIZE_BYTES: u64 = 1024 * 1024; // 1 MiB is ample for three small text documents.

pub fn build(path: &Path, documents: &[(&str, &str)]) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::HostOs(format!("creating seed image at {}: {e}", path.display())))?;
    file.set_len(IMAGE_SIZE_BYTES)
        .map_err(|e| Error::HostOs(format!("sizing seed image at {}: {e}", path.display())))?;

    let volume_label = *b"CIDATA     ";

    fatfs::format_volume(
        &file,
        FormatVolumeOptions::new().volume_label(volume_label),
    )
    .map_err(|e| Error::HostOs(format!("formatting seed image: {e}")))?;

    let fs = FileSystem::new(&file, FsOptions::new())
        .map_err(|e| Error::HostOs(format!("opening formatted seed image: {e}")))?;
    let root = fs.root_dir();

    for (name, content) in documents {
        let mut f = root
            .create_file(name)
            .map_err(|e| Error::HostOs(format!("creating {name} in seed image: {e}")))?;
        f.write_all(content.as_bytes())
            .map_err(|e| Error::HostOs(format!("writing {name} in seed image: {e}")))?;
    }

    Ok(())
}
