fn main() {
    println!("cargo:rerun-if-env-changed=SDL_LIB_DIR");

    // The software library needs nothing from the system; only the `sdl12`
    // backend links against native libraries.
    if std::env::var_os("CARGO_FEATURE_SDL12").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("SDL_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
}
