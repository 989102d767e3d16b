//! Build script: git hash embedding and pre-flight checks for GPU features.
//!
//! Verifies that required toolkits are installed before whisper-rs-sys tries
//! to compile, so a missing CUDA/Vulkan/ROCm install fails with a clear
//! message instead of a wall of C++ errors.

use std::process::Command;

fn main() {
    // Embed git short hash for version string
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        require_tool(
            "nvcc",
            &["--version"],
            "CUDA toolkit not found. Install from https://developer.nvidia.com/cuda-downloads \
             or build without CUDA: cargo build --release",
        );
    }
    if cfg!(feature = "vulkan") {
        require_tool(
            "vulkaninfo",
            &["--summary"],
            "Vulkan SDK not found. Install from https://vulkan.lunarg.com/ \
             or build without Vulkan: cargo build --release",
        );
    }
    if cfg!(feature = "hipblas") {
        require_tool(
            "rocminfo",
            &[],
            "ROCm not found. Install from https://rocm.docs.amd.com/ \
             or build without HipBLAS: cargo build --release",
        );
    }
    if cfg!(feature = "openblas") {
        check_openblas();
    }
}

/// Panic with `message` when `tool` cannot be executed.
fn require_tool(tool: &str, args: &[&str], message: &str) {
    if Command::new(tool).args(args).output().is_err() {
        panic!("\n\n`{}` not found — {}\n", tool, message);
    }
    println!("cargo::warning={} detected", tool);
}

fn check_openblas() {
    // Check for libopenblas via pkg-config or known paths
    let pkg_config_ok = Command::new("pkg-config")
        .args(["--exists", "openblas"])
        .status()
        .is_ok_and(|s| s.success());

    if !pkg_config_ok {
        let lib_exists = std::path::Path::new("/usr/lib/x86_64-linux-gnu/libopenblas.so").exists()
            || std::path::Path::new("/usr/lib/libopenblas.so").exists()
            || std::path::Path::new("/usr/lib64/libopenblas.so").exists();

        if !lib_exists {
            panic!(
                "\n\nOpenBLAS not found. Install: sudo apt install libopenblas-dev \
                 or build without OpenBLAS: cargo build --release\n",
            );
        }
    }
    println!("cargo::warning=OpenBLAS detected");
}
