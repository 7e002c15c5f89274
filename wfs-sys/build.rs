use std::env;
use std::path::PathBuf;

fn main() {
    // Only emit linking directives when the `wfs-sdk` feature is enabled.
    // This allows the crate to compile without the vendor SDK installed;
    // the extern declarations cost nothing unless a symbol is referenced.
    if env::var_os("CARGO_FEATURE_WFS_SDK").is_none() {
        return;
    }

    println!("cargo:rerun-if-env-changed=WFS_SDK_DIR");
    println!("cargo:rerun-if-env-changed=WFS_LIB_DIR");

    let sdk_dir = env::var("WFS_SDK_DIR").expect(
        "WFS_SDK_DIR environment variable must be set when `wfs-sdk` feature is enabled.",
    );

    // Allow WFS_LIB_DIR to override the default lib path
    let sdk_lib_path = if let Ok(lib_dir) = env::var("WFS_LIB_DIR") {
        PathBuf::from(lib_dir)
    } else {
        PathBuf::from(&sdk_dir).join("Lib")
    };

    // The lib path might not exist if the import library is installed
    // globally. Warn rather than panic.
    if !sdk_lib_path.exists() {
        eprintln!(
            "Warning: WFS SDK lib path does not exist: {:?}",
            sdk_lib_path
        );
    }

    println!("cargo:rustc-link-search=native={}", sdk_lib_path.display());

    // The Thorlabs driver ships separate 32- and 64-bit import libraries.
    let target = env::var("TARGET").unwrap_or_default();
    let pointer_width = env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();
    if target.contains("windows") {
        if pointer_width == "64" {
            println!("cargo:rustc-link-lib=WFS_64");
        } else {
            println!("cargo:rustc-link-lib=WFS_32");
        }
    } else {
        println!("cargo:rustc-link-lib=wfs");
    }
}
