fn main() {
    // ESP-IDF link arguments; host builds for tests have nothing to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
