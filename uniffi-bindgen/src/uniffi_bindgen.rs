//! Generates the Swift and Kotlin bindings for `credshim_core`.
//!
//! ```sh
//! cargo run -p uniffi-bindgen -- generate --library target/release/libcredshim_core.dylib \
//!     --language swift --out-dir swift/
//! ```

fn main() {
    uniffi::uniffi_bindgen_main();
}
