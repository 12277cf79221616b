//! Embeds the commit and build time shown by `cx-cli version`

use std::path::Path;
use std::process::Command;

use chrono::Utc;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string()).filter(|t| !t.is_empty())
}

fn main() {
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let built = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    println!("cargo:rustc-env=GIT_HASH={commit}");
    println!("cargo:rustc-env=BUILD_TIME={built}");

    // relative to the package directory
    if let Some(head) = git(&["rev-parse", "--git-path", "HEAD"]) {
        let head = Path::new(&head);
        if head.exists() {
            println!("cargo:rerun-if-changed={}", head.display());
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
