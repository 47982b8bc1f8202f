// build.rs

fn main() {
    // ESP-IDF link arguments are only needed for the firmware build
    if std::env::var_os("CARGO_FEATURE_ESP").is_some() {
        embuild::espidf::sysenv::output();
    }
}
// EOF
