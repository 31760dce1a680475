// build.rs

use std::env;

fn main() {
    // A packager may pin the reported version; otherwise use the crate version.
    let version = match env::var("STOMPHUB_VERSION") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "dev".to_string()),
    };
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=STOMPHUB_BUILD_VERSION={version}");
    println!("cargo:rustc-env=STOMPHUB_BUILD_PROFILE={profile}");
    println!("cargo:rerun-if-env-changed=STOMPHUB_VERSION");
}
