use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = Path::new(&std::env::var("OUT_DIR")?).join("manifest.rs");
    opinio_core::discovery::scan::write_manifest("src", &out)?;
    println!("cargo:rerun-if-changed=src/app/domains");
    Ok(())
}
