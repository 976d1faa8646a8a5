fn main() {
    // Generate C# bindings for .NET interop
    // Only the C ABI files are fed to the generator; Rust-only types live elsewhere.
    std::fs::create_dir_all("bindings").expect("Failed to create bindings directory");

    csbindgen::Builder::default()
        .input_extern_file("src/lib.rs")
        .input_extern_file("src/ffi.rs")
        .input_extern_file("src/types.rs")
        .csharp_dll_name("jxl_reconstruct")
        .csharp_namespace("JpegXL.Reconstruct")
        .csharp_class_name("NativeMethods")
        .csharp_class_accessibility("public")
        .csharp_use_nint_types(false) // Use UIntPtr/IntPtr for netstandard2.0 compatibility
        .generate_csharp_file("bindings/NativeMethods.g.cs")
        .expect("Failed to generate C# bindings");

    println!("cargo:rerun-if-changed=src/");
}
