//! Font discovery for the built-in PDF renderer.
//!
//! `genpdf` embeds TrueType fonts, so rendering needs a regular, bold, italic
//! and bold-italic face on disk. Directories are searched in this order:
//! `$PHOTO_REPORT_FONTS_DIR`, `assets/fonts` next to the executable,
//! `assets/fonts` in the crate directory, then common system locations. The
//! first directory holding a complete family wins.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::debug;

/// Environment variable naming a directory with font files.
pub const FONTS_DIR_ENV: &str = "PHOTO_REPORT_FONTS_DIR";

/// File names of the four faces of one family.
struct FamilyFiles {
    name: &'static str,
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

impl FamilyFiles {
    fn paths(&self, directory: &Path) -> [PathBuf; 4] {
        [self.regular, self.bold, self.italic, self.bold_italic].map(|file| directory.join(file))
    }

    fn complete_in(&self, directory: &Path) -> bool {
        self.paths(directory).iter().all(|path| path.is_file())
    }
}

const FAMILIES: &[FamilyFiles] = &[
    FamilyFiles {
        name: "Roboto",
        regular: "Roboto-Regular.ttf",
        bold: "Roboto-Bold.ttf",
        italic: "Roboto-Italic.ttf",
        bold_italic: "Roboto-BoldItalic.ttf",
    },
    FamilyFiles {
        name: "Liberation Sans",
        regular: "LiberationSans-Regular.ttf",
        bold: "LiberationSans-Bold.ttf",
        italic: "LiberationSans-Italic.ttf",
        bold_italic: "LiberationSans-BoldItalic.ttf",
    },
    FamilyFiles {
        name: "DejaVu Sans",
        regular: "DejaVuSans.ttf",
        bold: "DejaVuSans-Bold.ttf",
        italic: "DejaVuSans-Oblique.ttf",
        bold_italic: "DejaVuSans-BoldOblique.ttf",
    },
    FamilyFiles {
        name: "Arial",
        regular: "arial.ttf",
        bold: "arialbd.ttf",
        italic: "ariali.ttf",
        bold_italic: "arialbi.ttf",
    },
];

const SYSTEM_FONT_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/Library/Fonts",
];

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        push(path);
    }
    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }
    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    for directory in SYSTEM_FONT_DIRECTORIES {
        push(PathBuf::from(directory));
    }
    for var in ["WINDIR", "SystemRoot"] {
        if let Some(root) = env_path(var) {
            push(root.join("Fonts"));
        }
    }

    candidates
}

fn resolve_family() -> Option<(PathBuf, &'static FamilyFiles)> {
    font_directory_candidates().into_iter().find_map(|directory| {
        if !directory.is_dir() {
            return None;
        }
        FAMILIES
            .iter()
            .find(|family| family.complete_in(&directory))
            .map(|family| (directory, family))
    })
}

fn load_face(path: &Path) -> Result<FontData, Error> {
    FontData::load(path, None).map_err(|err| {
        Error::new(
            format!("Failed to load font {}: {}", path.display(), err),
            io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
        )
    })
}

/// Loads the first complete font family found in the search path.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let Some((directory, family)) = resolve_family() else {
        let searched = font_directory_candidates()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::new(
            format!(
                "No usable TrueType font family found. Checked: {searched}. Set {FONTS_DIR_ENV} to a directory with Roboto, Liberation Sans or DejaVu Sans."
            ),
            io::Error::new(io::ErrorKind::NotFound, "fonts not found"),
        ));
    };

    debug!("Using font family '{}' from {}", family.name, directory.display());
    let [regular, bold, italic, bold_italic] = family.paths(&directory);
    Ok(FontFamily {
        regular: load_face(&regular)?,
        bold: load_face(&bold)?,
        italic: load_face(&italic)?,
        bold_italic: load_face(&bold_italic)?,
    })
}

/// Indicates whether a complete font family is present somewhere in the search path.
pub fn default_fonts_available() -> bool {
    resolve_family().is_some()
}
