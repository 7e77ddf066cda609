//! Icon synthesis and conversion.
//!
//! | Platform | Format | Source |
//! |----------|--------|--------|
//! | Linux | PNG, XPM for RPM | configured PNG or a synthesized default |
//! | macOS | ICNS | configured `.icns` only |
//! | Windows | ICO | converted from PNG, or a configured `.ico` |

use crate::bundler::error::{Error, ErrorExt, Result};
use ico::{IconDir, IconDirEntry, IconImage, ResourceType};
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// XPM written for RPM packages when no icon can be converted.
pub const DEFAULT_XPM: &str = include_str!("../templates/linux/default-icon.xpm");

const DEFAULT_ICON_SIZE: u32 = 256;
const XPM_SIZE: u32 = 48;
const ICO_SIZES: [u32; 7] = [16, 24, 32, 48, 64, 128, 256];
const XPM_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789#+";

/// Loads and resizes an icon to exact dimensions.
///
/// Uses Lanczos3 filtering and returns an RGBA8 buffer ready for ICO or XPM encoding.
pub fn load_and_resize(
    source_path: &Path,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage> {
    let img = image::open(source_path).map_err(|e| Error::Fs {
        context: "loading icon for resize",
        path: source_path.to_path_buf(),
        error: std::io::Error::other(e),
    })?;

    let resized = img.resize_exact(
        target_width,
        target_height,
        image::imageops::FilterType::Lanczos3,
    );

    Ok(resized.to_rgba8())
}

/// Draws the default application icon: a rounded tile with a light inner square.
pub fn default_icon(size: u32) -> RgbaImage {
    let border = size / 16;
    let inner = size / 4;
    RgbaImage::from_fn(size, size, |x, y| {
        let edge = x < border || y < border || x >= size - border || y >= size - border;
        let center = (inner..size - inner).contains(&x) && (inner..size - inner).contains(&y);
        if edge {
            Rgba([0x1e, 0x3a, 0x5f, 0xff])
        } else if center {
            Rgba([0xe7, 0x6f, 0x24, 0xff])
        } else {
            Rgba([0xff, 0xff, 0xff, 0xff])
        }
    })
}

/// Writes the default icon as a PNG.
pub fn write_default_png(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).fs_context("creating icon directory", parent)?;
    }
    default_icon(DEFAULT_ICON_SIZE).save(dest)?;
    log::info!("Default icon written to {}", dest.display());
    Ok(())
}

/// Converts `source` to an ICO holding the standard Windows sizes.
pub fn create_ico_file(source: &Path, output: &Path) -> Result<()> {
    let mut icon_dir = IconDir::new(ResourceType::Icon);

    for size in ICO_SIZES {
        let rgba = load_and_resize(source, size, size)?;
        let icon_image = IconImage::from_rgba_data(size, size, rgba.into_raw());
        let entry = IconDirEntry::encode(&icon_image).map_err(|e| {
            Error::GenericError(format!("encoding {}x{} icon: {}", size, size, e))
        })?;
        icon_dir.add_entry(entry);
    }

    let file = std::fs::File::create(output).fs_context("creating ICO output file", output)?;
    icon_dir
        .write(file)
        .map_err(|e| Error::GenericError(format!("writing ICO data: {}", e)))?;

    log::info!("Created ICO file: {}", output.display());
    Ok(())
}

/// Encodes an image as XPM text.
///
/// Colours are reduced to four levels per channel so the palette always fits
/// one character per pixel. Pixels under half opacity become `None`.
pub fn encode_xpm(image: &RgbaImage, name: &str) -> String {
    let quantize = |c: u8| (c / 64) * 85;
    let mut palette: BTreeMap<[u8; 3], char> = BTreeMap::new();
    let mut rows = Vec::with_capacity(image.height() as usize);

    for y in 0..image.height() {
        let mut row = String::with_capacity(image.width() as usize);
        for x in 0..image.width() {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
            if a < 128 {
                row.push(' ');
                continue;
            }
            let key = [quantize(r), quantize(g), quantize(b)];
            let next = XPM_CHARS[palette.len() % XPM_CHARS.len()] as char;
            row.push(*palette.entry(key).or_insert(next));
        }
        rows.push(row);
    }

    let transparent = rows.iter().any(|r| r.contains(' '));
    let colors = palette.len() + usize::from(transparent);
    let mut out = String::new();
    let _ = writeln!(out, "/* XPM */");
    let _ = writeln!(out, "static char *{}[] = {{", name.replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
    let _ = writeln!(out, "\"{} {} {} 1\",", image.width(), image.height(), colors);
    if transparent {
        let _ = writeln!(out, "\"  c None\",");
    }
    for ([r, g, b], ch) in &palette {
        let _ = writeln!(out, "\"{ch} c #{r:02X}{g:02X}{b:02X}\",");
    }
    let last = rows.len().saturating_sub(1);
    for (i, row) in rows.iter().enumerate() {
        let _ = writeln!(out, "\"{row}\"{}", if i == last { "" } else { "," });
    }
    out.push_str("};\n");
    out
}

/// Converts `source` into a 48x48 XPM at `dest`.
pub fn write_xpm(source: &Path, dest: &Path) -> Result<()> {
    let image = load_and_resize(source, XPM_SIZE, XPM_SIZE)?;
    let name = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "icon".into());
    std::fs::write(dest, encode_xpm(&image, &name)).fs_context("writing XPM icon", dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpm_header_matches_palette() {
        let xpm = encode_xpm(&default_icon(16), "demo-icon");
        let lines: Vec<&str> = xpm.lines().collect();
        assert_eq!(lines[0], "/* XPM */");
        assert_eq!(lines[1], "static char *demo_icon[] = {");
        assert_eq!(lines[2], "\"16 16 3 1\",");
        assert_eq!(lines.len(), 3 + 3 + 16 + 1);
        assert!(xpm.ends_with("};\n"));
    }

    #[test]
    fn png_to_xpm_and_ico() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("demo.png");
        write_default_png(&png).unwrap();

        let xpm = dir.path().join("demo.xpm");
        write_xpm(&png, &xpm).unwrap();
        assert!(std::fs::read_to_string(&xpm).unwrap().contains("\"48 48 "));

        let ico = dir.path().join("demo.ico");
        create_ico_file(&png, &ico).unwrap();
        let icon_dir = IconDir::read(std::fs::File::open(&ico).unwrap()).unwrap();
        assert_eq!(icon_dir.entries().len(), ICO_SIZES.len());
    }

    #[test]
    fn default_xpm_is_embedded() {
        assert!(DEFAULT_XPM.starts_with("/* XPM */"));
    }
}
