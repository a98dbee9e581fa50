//! Repair for coverage maps that carry their order only in the primary header.
//!
//! Some MOC writers put the order in the primary `HPXMOC` keyword and leave
//! the table extension without `MOCORDER`. [`fix_header`] copies the value
//! across and writes a new file; every other card and all data bytes are
//! preserved verbatim.

use crate::error::{MocError, MocResult};
use crate::fits::{self, Header};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy primary `HPXMOC` into the first extension's `MOCORDER` and write the
/// result to `destination`, overwriting it if present.
///
/// Returns the destination path.
///
/// # Errors
/// Fails if the source cannot be read or parsed, has no `HPXMOC` keyword,
/// or has no extension HDU.
pub fn fix_header(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> MocResult<PathBuf> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    let bytes = fs::read(source)?;
    let hdus = fits::read_hdus(&bytes)?;
    let order = hdus[0].header.integer("HPXMOC")?;
    if hdus.len() < 2 {
        return Err(MocError::invalid_format(format!(
            "{} has no extension HDU",
            source.display()
        )));
    }

    let mut extension: Header = hdus[1].header.clone();
    extension.set("MOCORDER", order);

    let rewritten = fits::write_hdus(hdus.iter().enumerate().map(|(i, hdu)| {
        let header = if i == 1 { &extension } else { &hdu.header };
        (header, hdu.data)
    }));
    fs::write(destination, rewritten)?;

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        order,
        "copied HPXMOC into MOCORDER"
    );
    Ok(destination.to_path_buf())
}
