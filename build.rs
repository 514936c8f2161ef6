use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next finds FFmpeg through pkg-config everywhere except Windows,
// where it needs FFMPEG_DIR. Point vcpkg users at the right directory.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=keyshot: FFMPEG_DIR is not set. Install FFmpeg with vcpkg and export VCPKG_ROOT and FFMPEG_DIR."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if !candidate.exists() {
        println!(
            "cargo:warning=keyshot: no FFmpeg install under {}",
            candidate.display()
        );
        return;
    }

    println!(
        "cargo:warning=keyshot: found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to make discovery explicit",
        candidate.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=keyshot: set VCPKGRS_DYNAMIC=1 for dynamic vcpkg FFmpeg builds");
    }
}
