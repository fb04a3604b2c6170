use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let output_file = PathBuf::from(&crate_dir)
        .join("../../AmrScopeFFI.h")
        .display()
        .to_string();

    let mut config = cbindgen::Config::default();
    config.enumeration.prefix_with_name = true;
    config.enumeration.rename_variants = cbindgen::RenameRule::ScreamingSnakeCase;
    // Discriminants cross the boundary as u32, so nothing references these enums
    config.export.include = [
        "AmrFieldGroup",
        "AmrCenterMode",
        "AmrAxis",
        "AmrShapeKind",
        "AmrShellKind",
    ]
    .iter()
    .map(|name| (*name).to_string())
    .collect();

    // Generate C bindings using cbindgen
    cbindgen::Builder::new()
        .with_config(config)
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("AMRSCOPE_FFI_H")
        .with_documentation(true)
        .with_pragma_once(false)
        .generate()
        .expect("Unable to generate C bindings")
        .write_to_file(output_file);

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/error.rs");
    println!("cargo:rerun-if-changed=src/handles.rs");
}
