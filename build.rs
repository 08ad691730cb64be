//! Build script — locates and links the native `ru_tts` and `rulex` libraries
//! when the `native` feature is enabled.  Without the feature it does nothing,
//! so the pure-Rust core builds everywhere.
//!
//! ## Resolution order
//!
//! 1. **`RUTTS_LIB_DIR`** env var — explicit directory containing
//!    `libru_tts.{a,so,dylib}` (or `ru_tts.lib` on Windows) and the matching
//!    `rulex` library.
//!
//! 2. **Platform path walk** — the Debian/Ubuntu multi-arch directory for the
//!    current target, then `/usr/lib64`, `/usr/lib`, `/usr/local/lib`
//!    (plus the Homebrew prefixes on macOS).
//!
//! ## Static vs dynamic preference
//!
//! At every step the static archive wins over the shared library.  A static
//! `ru_tts` pulls in `sonic` (time-stretching) and a static `rulex` pulls in
//! Berkeley DB, so those are linked explicitly in that case.

use std::path::{Path, PathBuf};

/// Native libraries: (link name, extra libraries needed when linked statically).
const LIBS: &[(&str, &[&str])] = &[("ru_tts", &["sonic"]), ("rulex", &["db"])];

fn main() {
    println!("cargo:rerun-if-env-changed=RUTTS_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let target_os   = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    // ── 1. Explicit override ──────────────────────────────────────────────────
    let candidates = match std::env::var("RUTTS_LIB_DIR") {
        Ok(dir) => vec![dir],
        // ── 2. Platform path walk ─────────────────────────────────────────────
        Err(_) => candidate_dirs(&target_os, &target_arch),
    };

    for &(name, static_deps) in LIBS {
        if !link_library(name, static_deps, &candidates, &target_os) {
            panic!(
                "\n\n\
                 rutts: could not find the native `{name}` library.\n\
                 \n\
                 Build ru_tts / rulex for this target and point the build\n\
                 script at the directory that contains them:\n\
                 \n\
                 \t  RUTTS_LIB_DIR=/your/path/lib cargo build --features native\n\n"
            );
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Emit link directives for `name`, probing `dirs` in order.
/// Returns `false` when neither a static nor a shared library was found.
fn link_library(name: &str, static_deps: &[&str], dirs: &[String], target_os: &str) -> bool {
    let static_file = if target_os == "windows" {
        format!("{name}.lib")
    } else {
        format!("lib{name}.a")
    };
    for dir in dirs {
        if Path::new(dir).join(&static_file).exists() {
            println!("cargo:rustc-link-search=native={dir}");
            println!("cargo:rustc-link-lib=static={name}");
            for dep in static_deps {
                println!("cargo:rustc-link-lib={dep}");
            }
            return true;
        }
    }

    let dylib = match target_os {
        "macos" => format!("lib{name}.dylib"),
        "windows" => format!("{name}.dll"),
        _ => format!("lib{name}.so"),
    };
    for dir in dirs {
        if Path::new(dir).join(&dylib).exists() {
            println!("cargo:rustc-link-search=native={dir}");
            println!("cargo:rustc-link-lib=dylib={name}");
            return true;
        }
    }
    false
}

/// Ordered list of directories to probe for the native libraries.
fn candidate_dirs(target_os: &str, target_arch: &str) -> Vec<String> {
    let mut dirs: Vec<String> = Vec::new();

    if target_os == "macos" {
        for prefix in ["/opt/homebrew", "/usr/local"] {
            dirs.push(format!("{prefix}/lib"));
        }
    } else {
        let multiarch = match target_arch {
            "x86_64"  => "x86_64-linux-gnu",
            "aarch64" => "aarch64-linux-gnu",
            "arm"     => "arm-linux-gnueabihf",
            _         => "",
        };
        if !multiarch.is_empty() {
            dirs.push(format!("/usr/lib/{multiarch}"));
        }
        dirs.extend(["/usr/lib64", "/usr/lib", "/usr/local/lib"].map(String::from));
    }

    // Keep only directories that exist on this machine.
    dirs.into_iter()
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}
