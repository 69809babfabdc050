use crate::BinResult;
use gifplay::Frame;
use std::path::Path;

pub fn export_frame(frame: &Frame, path: &Path) -> BinResult<()> {
    let (buf, width, height) = frame.pixels().to_contiguous_buf();
    lodepng::encode32_file(path, &*buf, width, height)
        .map_err(|err| format!("Can't write {}: {}", path.display(), err))?;
    Ok(())
}
